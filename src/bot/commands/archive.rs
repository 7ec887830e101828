//! Archive Discord commands - `/archive export`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::utils::text_attachment},
        errors::{Error, Result},
    };
    use tracing::info;

    /// Parent command for organization archives.
    #[poise::command(slash_command, subcommands("archive_export"))]
    pub async fn archive(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Archive command. Available subcommands:\n`/archive export` - Download the organization as JSON")
            .await?;
        Ok(())
    }

    /// Downloads the warehouse, requests and shopping lists as one JSON file.
    #[poise::command(slash_command, rename = "export")]
    pub async fn archive_export(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.defer().await?;
        let data = ctx.data();
        let json = data.inventory.export_archive(data.org()).await?;
        let file_name = format!("{}-archive.json", data.org());
        info!("{} exported archive {}", ctx.author().name, file_name);

        ctx.send(
            poise::CreateReply::default()
                .content("📦 Organization archive attached.")
                .attachment(text_attachment(&file_name, json)),
        )
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
