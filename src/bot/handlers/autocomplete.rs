//! Autocomplete handlers for Discord slash command parameters.
//!
//! SKUs are suggested from the part catalog or the warehouse. Claims, deposits
//! and shopping lists are suggested by a readable label while the value sent
//! back to the command is the record id.

use crate::{bot::BotData, errors::Error};
use poise::serenity_prelude as serenity;

/// Discord shows at most 25 suggestions.
const MAX_CHOICES: usize = 25;

fn mentions(partial: &str, candidates: &[&str]) -> bool {
    let partial = partial.to_lowercase();
    candidates
        .iter()
        .any(|c| c.to_lowercase().contains(&partial))
}

/// Suggests catalog SKUs whose SKU or name contains the input.
///
/// # Arguments
/// * `ctx` - The poise context holding the inventory service
/// * `partial` - The partial string the user has typed so far
pub async fn autocomplete_catalog_sku(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    ctx.data()
        .inventory
        .search_parts(partial, MAX_CHOICES)
        .await
        .into_iter()
        .map(|(sku, part)| {
            serenity::AutocompleteChoice::new(format!("{sku} - {}", part.name), sku)
        })
        .collect()
}

/// Suggests SKUs currently tracked in the warehouse.
pub async fn autocomplete_warehouse_sku(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    let data = ctx.data();
    data.inventory
        .warehouse(data.org())
        .await
        .into_values()
        .filter(|entry| mentions(partial, &[entry.sku.as_str(), entry.name.as_str()]))
        .take(MAX_CHOICES)
        .map(|entry| {
            serenity::AutocompleteChoice::new(
                format!("{} - {} ({} on hand)", entry.sku, entry.name, entry.on_hand),
                entry.sku,
            )
        })
        .collect()
}

/// Suggests pending claims, newest first.
pub async fn autocomplete_pending_claim(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    let data = ctx.data();
    data.inventory
        .pending_claims(data.org())
        .await
        .into_iter()
        .filter(|claim| {
            mentions(
                partial,
                &[claim.name.as_str(), claim.team_name.as_str(), claim.id.as_str()],
            )
        })
        .take(MAX_CHOICES)
        .map(|claim| {
            serenity::AutocompleteChoice::new(
                format!("{} ({})", claim.name, claim.submitted_date),
                claim.id,
            )
        })
        .collect()
}

/// Suggests pending deposits, newest first.
pub async fn autocomplete_pending_deposit(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    let data = ctx.data();
    data.inventory
        .pending_deposits(data.org())
        .await
        .into_iter()
        .filter(|deposit| {
            mentions(
                partial,
                &[deposit.name.as_str(), deposit.team_name.as_str(), deposit.id.as_str()],
            )
        })
        .take(MAX_CHOICES)
        .map(|deposit| {
            serenity::AutocompleteChoice::new(
                format!("{} ({})", deposit.name, deposit.submitted_date),
                deposit.id,
            )
        })
        .collect()
}

/// Suggests shopping lists, including the auto-derived one.
pub async fn autocomplete_shopping_list(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    let data = ctx.data();
    data.inventory
        .shopping_lists(data.org())
        .await
        .into_iter()
        .filter(|list| mentions(partial, &[list.name.as_str(), list.id.as_str()]))
        .take(MAX_CHOICES)
        .map(|list| {
            serenity::AutocompleteChoice::new(
                format!("{} ({} items)", list.name, list.items.len()),
                list.id,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_is_case_insensitive() {
        assert!(mentions("part", &["A", "Part A"]));
        assert!(mentions("", &["anything"]));
        assert!(!mentions("zz", &["A", "Part A"]));
    }
}
