//! Catalog Discord commands - `/catalog search|refresh`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::utils::LIST_COLOR},
        core::{dashboard::format_cost, shopping::parse_price},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    const DEFAULT_RESULTS: usize = 10;
    const MAX_RESULTS: usize = 25;

    /// Parent command for the part catalog.
    #[poise::command(slash_command, subcommands("catalog_search", "catalog_refresh"))]
    pub async fn catalog(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Catalog command. Available subcommands:\n\
            `/catalog search` - Find parts by SKU or name\n\
            `/catalog refresh` - Reload the part catalog";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Finds catalog parts whose SKU or name contains the search term.
    #[poise::command(slash_command, rename = "search")]
    pub async fn catalog_search(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Part of a SKU or name"] term: String,
        #[description = "How many results to show (max 25)"] limit: Option<u8>,
    ) -> Result<()> {
        let limit = limit.map_or(DEFAULT_RESULTS, usize::from).clamp(1, MAX_RESULTS);
        let parts = ctx.data().inventory.search_parts(&term, limit).await;

        if parts.is_empty() {
            ctx.say(format!("No catalog parts match '{term}'.")).await?;
            return Ok(());
        }

        let fields: Vec<(String, String, bool)> = parts
            .iter()
            .map(|(sku, part)| {
                let stock = if part.externally_in_stock {
                    "in stock"
                } else {
                    "out of stock"
                };
                (
                    format!("{} (`{sku}`)", part.name),
                    format!(
                        "{} | {} | {stock}",
                        format_cost(parse_price(&part.unit_price)),
                        part.category
                    ),
                    false,
                )
            })
            .collect();

        let embed = serenity::CreateEmbed::default()
            .title(format!("**Catalog results for '{term}'**"))
            .color(LIST_COLOR)
            .fields(fields);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Drops the cached catalog and loads it again.
    #[poise::command(slash_command, rename = "refresh")]
    pub async fn catalog_refresh(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.defer().await?;
        let count = ctx.data().inventory.refresh_catalog().await?;
        info!("{} refreshed the catalog ({} parts)", ctx.author().name, count);

        ctx.say(format!("🔄 Catalog reloaded: {count} parts."))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
