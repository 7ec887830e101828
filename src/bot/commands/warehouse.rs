//! Warehouse Discord commands - `/warehouse list|add|remove`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::utils::{LIST_COLOR, truncate_field},
            handlers::autocomplete,
        },
        core::dashboard,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    /// Parent command for the warehouse ledger.
    #[poise::command(
        slash_command,
        subcommands("warehouse_list", "warehouse_add", "warehouse_remove")
    )]
    pub async fn warehouse(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Warehouse command. Available subcommands:\n\
            `/warehouse list` - Show every tracked part\n\
            `/warehouse add` - Start tracking a catalog part\n\
            `/warehouse remove` - Stop tracking a part with a zero balance";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Lists every tracked SKU with its on-hand quantity.
    #[poise::command(slash_command, rename = "list")]
    pub async fn warehouse_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only show parts that are short"] short_only: Option<bool>,
    ) -> Result<()> {
        let data = ctx.data();
        let entries = data.inventory.warehouse(data.org()).await;
        let short_only = short_only.unwrap_or(false);

        let lines: Vec<String> = entries
            .values()
            .filter(|entry| !short_only || entry.on_hand < 0)
            .map(|entry| {
                format!(
                    "• {} (`{}`): **{}**",
                    entry.name,
                    entry.sku,
                    dashboard::format_on_hand(entry.on_hand)
                )
            })
            .collect();

        if lines.is_empty() {
            let message = if short_only {
                "Nothing is short right now."
            } else {
                "The warehouse is empty. Use `/warehouse add` to start tracking parts."
            };
            ctx.say(message).await?;
            return Ok(());
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("**Warehouse** ({} parts)", lines.len()))
            .color(LIST_COLOR)
            .description(truncate_field(&lines.join("\n")));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Starts tracking a catalog part with an initial quantity.
    #[poise::command(slash_command, rename = "add")]
    pub async fn warehouse_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Catalog SKU"]
        #[autocomplete = "autocomplete::autocomplete_catalog_sku"]
        sku: String,
        #[description = "Initial on-hand quantity (at least 1)"] quantity: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let entry = data
            .inventory
            .add_warehouse_item(data.org(), sku.trim(), quantity)
            .await?;

        info!("{} started tracking {}", ctx.author().name, entry.sku);
        ctx.say(format!(
            "✅ Now tracking **{}** (`{}`) with {} on hand.",
            entry.name, entry.sku, entry.on_hand
        ))
        .await?;
        Ok(())
    }

    /// Stops tracking a part. Its on-hand quantity must be zero.
    #[poise::command(slash_command, rename = "remove")]
    pub async fn warehouse_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Tracked SKU"]
        #[autocomplete = "autocomplete::autocomplete_warehouse_sku"]
        sku: String,
    ) -> Result<()> {
        let data = ctx.data();
        data.inventory
            .remove_warehouse_item(data.org(), sku.trim())
            .await?;

        info!("{} stopped tracking {}", ctx.author().name, sku);
        ctx.say(format!("🗑️ Stopped tracking `{}`.", sku.trim()))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
