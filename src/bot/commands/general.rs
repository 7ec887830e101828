//! General Discord commands - ping, help, and the dashboard.
//! `ping` and `help` don't touch the database; `dashboard` reads the
//! organization overview through the inventory service.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::utils::LIST_COLOR},
        core::dashboard::{self, DashboardSummary},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Responds with "Pong!" to test bot connectivity.
    ///
    /// This is a simple health check command that doesn't require any database operations.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Stockroom Help**\n\
        Items are written as `SKU:QTY` separated by commas, e.g. `A:2, B:1`.\n\n\
        **Requests**\n\
        • `/claim create <team> <items> [name]` - Ask to take parts out of the warehouse.\n\
        • `/deposit create <team> <items> [name]` - Record parts coming into the warehouse.\n\
        • `/claim list`, `/deposit list` - Show recent requests.\n\
        • `/claim edit`, `/deposit edit` - Change a pending request.\n\
        • `/claim approve|reject`, `/deposit approve|reject` - Approvers only.\n\
        • `/claim import`, `/deposit import` - Create a request from a CSV file.\n\n\
        **Warehouse**\n\
        • `/warehouse list` - Show on-hand quantities (negative means short).\n\
        • `/warehouse add <sku> <quantity>` - Start tracking a catalog part.\n\
        • `/warehouse remove <sku>` - Stop tracking a part with a zero balance.\n\n\
        **Shopping**\n\
        • `/shopping list` - All lists, including the auto-derived Required Parts list.\n\
        • `/shopping show|create|delete|export|import` - Manage shopping lists.\n\
        • `/shopping deposit <list>` - Turn a list into a pending purchase-order deposit.\n\n\
        **Other**\n\
        • `/dashboard` - Organization overview.\n\
        • `/catalog search <term>` - Look up parts. `/catalog refresh` reloads the catalog.\n\
        • `/archive export` - Download the whole organization as JSON.\n\
        • `/ping` - Checks if the bot is responsive.";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Shows required parts, pending requests and recent activity.
    #[poise::command(slash_command)]
    pub async fn dashboard(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let summary = data.inventory.dashboard(data.org()).await;

        ctx.send(poise::CreateReply::default().embed(dashboard_embed(&summary)))
            .await?;
        Ok(())
    }

    fn dashboard_embed(summary: &DashboardSummary) -> serenity::CreateEmbed {
        let shortfalls = if summary.shortfalls.is_empty() {
            "Nothing is short. 🎉".to_string()
        } else {
            summary
                .shortfalls
                .iter()
                .map(|s| {
                    format!(
                        "• {} (`{}`): {}",
                        s.name,
                        s.sku,
                        dashboard::format_on_hand(s.on_hand)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let activity = if summary.recent_activity.is_empty() {
            "No claims or deposits yet.".to_string()
        } else {
            summary
                .recent_activity
                .iter()
                .map(dashboard::format_activity)
                .collect::<Vec<_>>()
                .join("\n")
        };

        serenity::CreateEmbed::default()
            .title("📦 Stockroom Dashboard")
            .color(LIST_COLOR)
            .field(
                "Required parts",
                summary.required_parts.to_string(),
                true,
            )
            .field("Pending claims", summary.pending_claims.to_string(), true)
            .field(
                "Pending deposits",
                summary.pending_deposits.to_string(),
                true,
            )
            .field("Shortfalls", shortfalls, false)
            .field("Recent activity", activity, false)
    }
}

// Re-export all commands
pub use inner::*;
