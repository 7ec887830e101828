//! Shopping list Discord commands -
//! `/shopping list|show|create|edit|delete|export|import|deposit`.
//!
//! The Required Parts list is derived from warehouse shortfalls and can only be
//! viewed, exported or turned into a deposit.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::utils::{
                ImportFormat, LIST_COLOR, parse_items, read_csv_attachment, request_embed,
                text_attachment, truncate_field,
            },
            handlers::autocomplete,
        },
        core::{
            dashboard::format_cost,
            import::CsvShape,
            shopping::{ShoppingListDraft, ShoppingListView, parse_price},
        },
        entities::ShoppingListItem,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    fn list_embed(list: &ShoppingListView) -> serenity::CreateEmbed {
        let items = if list.items.is_empty() {
            "(no items)".to_string()
        } else {
            list.items
                .iter()
                .map(|item| {
                    let stock = if item.externally_in_stock {
                        ""
                    } else {
                        " (out of stock at vendor)"
                    };
                    format!(
                        "• {} (`{}`) ×{} @ {}{stock}",
                        item.name,
                        item.sku,
                        item.quantity,
                        format_cost(parse_price(&item.unit_price))
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let title = if list.is_default {
            format!("🛒 {} (auto)", list.name)
        } else {
            format!("🛒 {}", list.name)
        };

        let mut embed = serenity::CreateEmbed::default()
            .title(title)
            .color(LIST_COLOR)
            .field("Items", truncate_field(&items), false)
            .field("Total", format_cost(list.total_cost), true)
            .footer(serenity::CreateEmbedFooter::new(format!("ID: {}", list.id)));
        if !list.description.is_empty() {
            embed = embed.description(&list.description);
        }
        embed
    }

    /// Parent command for shopping lists.
    #[poise::command(
        slash_command,
        subcommands(
            "shopping_list",
            "shopping_show",
            "shopping_create",
            "shopping_edit",
            "shopping_delete",
            "shopping_export",
            "shopping_import",
            "shopping_deposit"
        )
    )]
    pub async fn shopping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Shopping command. Available subcommands:\n\
            `/shopping list` - Show every shopping list\n\
            `/shopping show` - Show one list with prices\n\
            `/shopping create` - Create a list\n\
            `/shopping edit` - Change a list\n\
            `/shopping delete` - Delete a list\n\
            `/shopping export` - Download a list as CSV\n\
            `/shopping import` - Create a list from a CSV file\n\
            `/shopping deposit` - Turn a list into a pending deposit";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Lists every shopping list, the Required Parts list first.
    #[poise::command(slash_command, rename = "list")]
    pub async fn shopping_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let lists = data.inventory.shopping_lists(data.org()).await;

        if lists.is_empty() {
            ctx.say("No shopping lists, and nothing is short. Use `/shopping create` to make one!")
                .await?;
            return Ok(());
        }

        let fields: Vec<(String, String, bool)> = lists
            .iter()
            .map(|list| {
                (
                    list.name.clone(),
                    format!(
                        "{} item(s) | {}\nID: `{}`",
                        list.items.len(),
                        format_cost(list.total_cost),
                        list.id
                    ),
                    false,
                )
            })
            .collect();

        let embed = serenity::CreateEmbed::default()
            .title("**Shopping Lists**")
            .color(LIST_COLOR)
            .fields(fields);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows one shopping list with prices and the total cost.
    #[poise::command(slash_command, rename = "show")]
    pub async fn shopping_show(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Shopping list"]
        #[autocomplete = "autocomplete::autocomplete_shopping_list"]
        id: String,
    ) -> Result<()> {
        let data = ctx.data();
        let list = data.inventory.get_shopping_list(data.org(), &id).await?;

        ctx.send(poise::CreateReply::default().embed(list_embed(&list)))
            .await?;
        Ok(())
    }

    /// Creates a shopping list.
    #[poise::command(slash_command, rename = "create")]
    pub async fn shopping_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "List name"] name: String,
        #[description = "Items as SKU:QTY, comma separated"] items: String,
        #[description = "Description"] description: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let draft = ShoppingListDraft {
            name,
            description: description.unwrap_or_default(),
            items: parse_items(&items)?,
            created_by: ctx.author().id.to_string(),
        };

        let list = data
            .inventory
            .create_shopping_list(data.org(), &draft)
            .await?;
        info!("{} created shopping list {}", ctx.author().name, list.id);

        ctx.send(
            poise::CreateReply::default()
                .content("✅ Shopping list created.")
                .embed(list_embed(&list)),
        )
        .await?;
        Ok(())
    }

    /// Edits a shopping list. Omitted fields keep their current value.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn shopping_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Shopping list"]
        #[autocomplete = "autocomplete::autocomplete_shopping_list"]
        id: String,
        #[description = "New name"] name: Option<String>,
        #[description = "New items as SKU:QTY, replacing the current list"] items: Option<String>,
        #[description = "New description"] description: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let current = data.inventory.get_shopping_list(data.org(), &id).await?;

        let items = match items {
            Some(items) => parse_items(&items)?,
            None => current.items.iter().map(ShoppingListItem::to_line_item).collect(),
        };
        let draft = ShoppingListDraft {
            name: name.unwrap_or(current.name),
            description: description.unwrap_or(current.description),
            items,
            created_by: ctx.author().id.to_string(),
        };

        let list = data
            .inventory
            .modify_shopping_list(data.org(), &id, &draft)
            .await?;
        info!("{} edited shopping list {}", ctx.author().name, list.id);

        ctx.send(
            poise::CreateReply::default()
                .content("✏️ Shopping list updated.")
                .embed(list_embed(&list)),
        )
        .await?;
        Ok(())
    }

    /// Deletes a shopping list.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn shopping_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Shopping list"]
        #[autocomplete = "autocomplete::autocomplete_shopping_list"]
        id: String,
    ) -> Result<()> {
        let data = ctx.data();
        data.inventory
            .delete_shopping_list(data.org(), &id)
            .await?;
        info!("{} deleted shopping list {}", ctx.author().name, id);

        ctx.say("🗑️ Shopping list deleted.").await?;
        Ok(())
    }

    /// Downloads a shopping list as a `SKU,QTY` CSV file.
    #[poise::command(slash_command, rename = "export")]
    pub async fn shopping_export(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Shopping list"]
        #[autocomplete = "autocomplete::autocomplete_shopping_list"]
        id: String,
    ) -> Result<()> {
        let data = ctx.data();
        let (file_name, csv) = data
            .inventory
            .export_shopping_list(data.org(), &id)
            .await?;

        ctx.send(
            poise::CreateReply::default()
                .content(format!("📤 Exported `{file_name}`."))
                .attachment(text_attachment(&file_name, csv)),
        )
        .await?;
        Ok(())
    }

    /// Creates a shopping list from a CSV file.
    #[poise::command(slash_command, rename = "import")]
    pub async fn shopping_import(
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
            .import_shopping_list(data.org(), &csv, shape, &ctx.author().id.to_string())
            .await?;

        let Some(list) = imported else {
            ctx.say(format!(
                "⚠️ No usable rows in '{}'. Check the column layout and that the SKUs are in the catalog.",
                file.filename
            ))
            .await?;
            return Ok(());
        };

        info!("{} imported shopping list {}", ctx.author().name, list.id);
        ctx.send(
            poise::CreateReply::default()
                .content(format!("📥 Imported shopping list from '{}'.", file.filename))
                .embed(list_embed(&list)),
        )
        .await?;
        Ok(())
    }

    /// Turns a shopping list into a pending purchase-order deposit.
    #[poise::command(slash_command, rename = "deposit")]
    pub async fn shopping_deposit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Shopping list"]
        #[autocomplete = "autocomplete::autocomplete_shopping_list"]
        id: String,
    ) -> Result<()> {
        let data = ctx.data();
        let deposit = data
            .inventory
            .deposit_from_shopping_list(data.org(), &id, &ctx.author().id.to_string())
            .await?;
        info!(
            "{} created deposit {} from shopping list {}",
            ctx.author().name,
            deposit.id,
            id
        );

        let embed = request_embed(
            "Deposit",
            &deposit.id,
            &deposit.name,
            &deposit.team_name,
            deposit.status,
            &deposit.items.0,
        );
        ctx.send(
            poise::CreateReply::default()
                .content("✅ Purchase order deposit created. Approve it once the parts arrive.")
                .embed(embed),
        )
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
