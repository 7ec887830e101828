//! Claim Discord commands - `/claim create|edit|approve|reject|list|import`.
//!
//! A claim asks to take parts out of the warehouse. Creating one shows what
//! approval would do to each balance; only approvers may approve or reject.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::utils::{
                ImportFormat, LIST_COLOR, format_changes, format_projection, parse_items,
                read_csv_attachment, request_embed, status_badge, truncate_field,
            },
            handlers::autocomplete,
            is_approver,
        },
        core::{import::CsvShape, reconcile::RequestDraft},
        entities::ClaimModel,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    const LIST_LIMIT: usize = 10;

    fn claim_embed(claim: &ClaimModel) -> serenity::CreateEmbed {
        let fulfill = if claim.can_fulfill {
            "✅ In stock"
        } else {
            "⚠️ Not enough stock"
        };
        request_embed(
            "Claim",
            &claim.id,
            &claim.name,
            &claim.team_name,
            claim.status,
            &claim.items.0,
        )
        .field("Stock check", fulfill, true)
    }

    /// Parent command for claims.
    #[poise::command(
        slash_command,
        subcommands(
            "claim_create",
            "claim_edit",
            "claim_approve",
            "claim_reject",
            "claim_list",
            "claim_import"
        )
    )]
    pub async fn claim(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Claim command. Available subcommands:\n\
            `/claim create` - Ask to take parts out of the warehouse\n\
            `/claim edit` - Change a pending claim\n\
            `/claim approve` - Apply a claim to the warehouse (approvers only)\n\
            `/claim reject` - Delete a pending claim (approvers only)\n\
            `/claim list` - Show recent claims\n\
            `/claim import` - Create a claim from a CSV file";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a pending claim.
    #[poise::command(slash_command, rename = "create")]
    pub async fn claim_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Team taking the parts"] team: String,
        #[description = "Items as SKU:QTY, comma separated (e.g. A:2, B:1)"] items: String,
        #[description = "Display name (defaults to the team name)"] name: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let mut draft =
            RequestDraft::new(team, parse_items(&items)?).created_by(ctx.author().id.to_string());
        if let Some(name) = name {
            draft = draft.named(name);
        }

        let claim = data.inventory.create_claim(data.org(), &draft).await?;
        let projection = data.inventory.claim_projection(data.org(), &claim.id).await?;
        info!("{} created claim {}", ctx.author().name, claim.id);

        let embed = claim_embed(&claim).field(
            "If approved",
            truncate_field(&format_projection(&projection)),
            false,
        );
        ctx.send(
            poise::CreateReply::default()
                .content("✅ Claim submitted for approval.")
                .embed(embed),
        )
        .await?;
        Ok(())
    }

    /// Edits a pending claim. Omitted fields keep their current value.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn claim_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pending claim"]
        #[autocomplete = "autocomplete::autocomplete_pending_claim"]
        id: String,
        #[description = "New team name"] team: Option<String>,
        #[description = "New items as SKU:QTY, replacing the current list"] items: Option<String>,
        #[description = "New display name"] name: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let current = data.inventory.get_claim(data.org(), &id).await?;

        let items = match items {
            Some(items) => parse_items(&items)?,
            None => current.items.0.clone(),
        };
        let draft = RequestDraft::new(team.unwrap_or(current.team_name), items)
            .named(name.unwrap_or(current.name))
            .created_by(current.created_by);

        let claim = data.inventory.modify_claim(data.org(), &id, &draft).await?;
        info!("{} edited claim {}", ctx.author().name, claim.id);

        ctx.send(
            poise::CreateReply::default()
                .content("✏️ Claim updated.")
                .embed(claim_embed(&claim)),
        )
        .await?;
        Ok(())
    }

    /// Approves a claim and removes its items from the warehouse.
    #[poise::command(slash_command, rename = "approve", check = "is_approver")]
    pub async fn claim_approve(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pending claim"]
        #[autocomplete = "autocomplete::autocomplete_pending_claim"]
        id: String,
    ) -> Result<()> {
        let data = ctx.data();
        let approval = data.inventory.approve_claim(data.org(), &id).await?;
        info!("{} approved claim {}", ctx.author().name, id);

        let embed = claim_embed(&approval.record).field(
            "Warehouse changes",
            truncate_field(&format_changes(&approval.changes)),
            false,
        );
        ctx.send(
            poise::CreateReply::default()
                .content("✅ Claim approved.")
                .embed(embed),
        )
        .await?;
        Ok(())
    }

    /// Rejects a pending claim. Rejected claims are deleted.
    #[poise::command(slash_command, rename = "reject", check = "is_approver")]
    pub async fn claim_reject(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pending claim"]
        #[autocomplete = "autocomplete::autocomplete_pending_claim"]
        id: String,
    ) -> Result<()> {
        let data = ctx.data();
        let claim = data.inventory.get_claim(data.org(), &id).await?;
        data.inventory.delete_claim(data.org(), &id).await?;
        info!("{} rejected claim {}", ctx.author().name, id);

        ctx.say(format!(
            "🗑️ Rejected claim **{}** from {}.",
            claim.name, claim.team_name
        ))
        .await?;
        Ok(())
    }

    /// Lists recent claims, newest first.
    #[poise::command(slash_command, rename = "list")]
    pub async fn claim_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only show pending claims"] pending_only: Option<bool>,
    ) -> Result<()> {
        let data = ctx.data();
        let claims = if pending_only.unwrap_or(false) {
            data.inventory.pending_claims(data.org()).await
        } else {
            data.inventory.claims(data.org()).await
        };

        if claims.is_empty() {
            ctx.say("No claims found. Use `/claim create` to submit one!")
                .await?;
            return Ok(());
        }

        let fields: Vec<(String, String, bool)> = claims
            .iter()
            .take(LIST_LIMIT)
            .map(|claim| {
                (
                    format!("{} ({})", claim.name, status_badge(claim.status)),
                    format!(
                        "Team: {} | {} item(s) | {}\nID: `{}`",
                        claim.team_name,
                        claim.items.0.len(),
                        claim.submitted_date,
                        claim.id
                    ),
                    false,
                )
            })
            .collect();

        let embed = serenity::CreateEmbed::default()
            .title(format!("**Claims** ({} total)", claims.len()))
            .color(LIST_COLOR)
            .fields(fields);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Creates a pending claim from a CSV file.
    #[poise::command(slash_command, rename = "import")]
    pub async fn claim_import(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "CSV file with a header row"] file: serenity::Attachment,
        #[description = "Column layout (default: SKU rows)"] format: Option<ImportFormat>,
    ) -> Result<()> {
        ctx.defer().await?;
        let data = ctx.data();
        let csv = read_csv_attachment(&file).await?;
        let shape = format.map(CsvShape::from).unwrap_or_default();

        let imported = data
            .inventory
            .import_claim(data.org(), &csv, shape, &ctx.author().id.to_string())
            .await?;

        let Some(claim) = imported else {
            ctx.say(format!(
                "⚠️ No usable rows in '{}'. Check the column layout and that the SKUs are in the catalog.",
                file.filename
            ))
            .await?;
            return Ok(());
        };

        info!("{} imported claim {}", ctx.author().name, claim.id);
        ctx.send(
            poise::CreateReply::default()
                .content(format!("📥 Imported claim from '{}'.", file.filename))
                .embed(claim_embed(&claim)),
        )
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
