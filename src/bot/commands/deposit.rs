//! Deposit Discord commands - `/deposit create|edit|approve|reject|list|import`.
//!
//! A deposit records parts coming into the warehouse, typically a delivered
//! purchase order. Approval adds every item to the ledger and may clear a
//! shortfall.

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
        entities::DepositModel,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    const LIST_LIMIT: usize = 10;

    fn deposit_embed(deposit: &DepositModel) -> serenity::CreateEmbed {
        request_embed(
            "Deposit",
            &deposit.id,
            &deposit.name,
            &deposit.team_name,
            deposit.status,
            &deposit.items.0,
        )
    }

    /// Parent command for deposits.
    #[poise::command(
        slash_command,
        subcommands(
            "deposit_create",
            "deposit_edit",
            "deposit_approve",
            "deposit_reject",
            "deposit_list",
            "deposit_import"
        )
    )]
    pub async fn deposit(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Deposit command. Available subcommands:\n\
            `/deposit create` - Record parts coming into the warehouse\n\
            `/deposit edit` - Change a pending deposit\n\
            `/deposit approve` - Apply a deposit to the warehouse (approvers only)\n\
            `/deposit reject` - Delete a pending deposit (approvers only)\n\
            `/deposit list` - Show recent deposits\n\
            `/deposit import` - Create a deposit from a CSV file";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a pending deposit.
    #[poise::command(slash_command, rename = "create")]
    pub async fn deposit_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Team bringing the parts"] team: String,
        #[description = "Items as SKU:QTY, comma separated (e.g. A:2, B:1)"] items: String,
        #[description = "Display name (defaults to the team name)"] name: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let mut draft =
            RequestDraft::new(team, parse_items(&items)?).created_by(ctx.author().id.to_string());
        if let Some(name) = name {
            draft = draft.named(name);
        }

        let deposit = data.inventory.create_deposit(data.org(), &draft).await?;
        let projection = data.inventory.deposit_projection(data.org(), &deposit.id).await?;
        info!("{} created deposit {}", ctx.author().name, deposit.id);

        let embed = deposit_embed(&deposit).field(
            "If approved",
            truncate_field(&format_projection(&projection)),
            false,
        );
        ctx.send(
            poise::CreateReply::default()
                .content("✅ Deposit submitted for approval.")
                .embed(embed),
        )
        .await?;
        Ok(())
    }

    /// Edits a pending deposit. Omitted fields keep their current value.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn deposit_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pending deposit"]
        #[autocomplete = "autocomplete::autocomplete_pending_deposit"]
        id: String,
        #[description = "New team name"] team: Option<String>,
        #[description = "New items as SKU:QTY, replacing the current list"] items: Option<String>,
        #[description = "New display name"] name: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let current = data.inventory.get_deposit(data.org(), &id).await?;

        let items = match items {
            Some(items) => parse_items(&items)?,
            None => current.items.0.clone(),
        };
        let draft = RequestDraft::new(team.unwrap_or(current.team_name), items)
            .named(name.unwrap_or(current.name))
            .created_by(current.created_by);

        let deposit = data.inventory.modify_deposit(data.org(), &id, &draft).await?;
        info!("{} edited deposit {}", ctx.author().name, deposit.id);

        ctx.send(
            poise::CreateReply::default()
                .content("✏️ Deposit updated.")
                .embed(deposit_embed(&deposit)),
        )
        .await?;
        Ok(())
    }

    /// Approves a deposit and adds its items to the warehouse.
    #[poise::command(slash_command, rename = "approve", check = "is_approver")]
    pub async fn deposit_approve(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pending deposit"]
        #[autocomplete = "autocomplete::autocomplete_pending_deposit"]
        id: String,
    ) -> Result<()> {
        let data = ctx.data();
        let approval = data.inventory.approve_deposit(data.org(), &id).await?;
        info!("{} approved deposit {}", ctx.author().name, id);

        let embed = deposit_embed(&approval.record).field(
            "Warehouse changes",
            truncate_field(&format_changes(&approval.changes)),
            false,
        );
        ctx.send(
            poise::CreateReply::default()
                .content("✅ Deposit approved.")
                .embed(embed),
        )
        .await?;
        Ok(())
    }

    /// Rejects a pending deposit. Rejected deposits are deleted.
    #[poise::command(slash_command, rename = "reject", check = "is_approver")]
    pub async fn deposit_reject(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pending deposit"]
        #[autocomplete = "autocomplete::autocomplete_pending_deposit"]
        id: String,
    ) -> Result<()> {
        let data = ctx.data();
        let deposit = data.inventory.get_deposit(data.org(), &id).await?;
        data.inventory.delete_deposit(data.org(), &id).await?;
        info!("{} rejected deposit {}", ctx.author().name, id);

        ctx.say(format!(
            "🗑️ Rejected deposit **{}** from {}.",
            deposit.name, deposit.team_name
        ))
        .await?;
        Ok(())
    }

    /// Lists recent deposits, newest first.
    #[poise::command(slash_command, rename = "list")]
    pub async fn deposit_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only show pending deposits"] pending_only: Option<bool>,
    ) -> Result<()> {
        let data = ctx.data();
        let deposits = if pending_only.unwrap_or(false) {
            data.inventory.pending_deposits(data.org()).await
        } else {
            data.inventory.deposits(data.org()).await
        };

        if deposits.is_empty() {
            ctx.say("No deposits found. Use `/deposit create` to submit one!")
                .await?;
            return Ok(());
        }

        let fields: Vec<(String, String, bool)> = deposits
            .iter()
            .take(LIST_LIMIT)
            .map(|deposit| {
                (
                    format!("{} ({})", deposit.name, status_badge(deposit.status)),
                    format!(
                        "Team: {} | {} item(s) | {}\nID: `{}`",
                        deposit.team_name,
                        deposit.items.0.len(),
                        deposit.submitted_date,
                        deposit.id
                    ),
                    false,
                )
            })
            .collect();

        let embed = serenity::CreateEmbed::default()
            .title(format!("**Deposits** ({} total)", deposits.len()))
            .color(LIST_COLOR)
            .fields(fields);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Creates a pending deposit from a CSV file.
    #[poise::command(slash_command, rename = "import")]
    pub async fn deposit_import(
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
            .import_deposit(data.org(), &csv, shape, &ctx.author().id.to_string())
            .await?;

        let Some(deposit) = imported else {
            ctx.say(format!(
                "⚠️ No usable rows in '{}'. Check the column layout and that the SKUs are in the catalog.",
                file.filename
            ))
            .await?;
            return Ok(());
        };

        info!("{} imported deposit {}", ctx.author().name, deposit.id);
        ctx.send(
            poise::CreateReply::default()
                .content(format!("📥 Imported deposit from '{}'.", file.filename))
                .embed(deposit_embed(&deposit)),
        )
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
