//! Helpers shared by the Discord commands: parsing item lists typed into a
//! slash command, rendering records as embed text, and moving CSV files in
//! and out of Discord attachments.

use crate::{
    core::{dashboard, import::CsvShape, reconcile::Projection, warehouse::StockChange},
    entities::{LineItem, RequestStatus},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use tracing::debug;

/// Embed colour for pending records.
pub const PENDING_COLOR: u32 = 0x00F1_C40F;
/// Embed colour for approved records.
pub const APPROVED_COLOR: u32 = 0x002E_CC71;
/// Embed colour for neutral listings.
pub const LIST_COLOR: u32 = 0x0058_65F2;

/// Largest CSV attachment accepted for import.
const MAX_IMPORT_BYTES: u32 = 1024 * 1024;

/// Column layout offered to users importing a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ImportFormat {
    /// `sku,quantity,team`
    #[name = "SKU rows (sku,quantity,team)"]
    StockRows,
    /// `item,quantity,sku,description`
    #[name = "CAD export (item,quantity,sku,description)"]
    CadExport,
}

impl From<ImportFormat> for CsvShape {
    fn from(format: ImportFormat) -> Self {
        match format {
            ImportFormat::StockRows => Self::StockRows,
            ImportFormat::CadExport => Self::CadExport,
        }
    }
}

/// Parses `SKU:QTY` entries separated by commas or newlines.
///
/// A missing quantity means 1. Names are left blank for the core to fill from
/// the catalog. Quantities are checked for sign by the core, not here.
pub fn parse_items(input: &str) -> Result<Vec<LineItem>> {
    input
        .split([',', '\n', ';'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (sku, quantity) = match entry.split_once([':', '=']) {
                Some((sku, quantity)) => (sku.trim(), quantity.trim()),
                None => (entry, "1"),
            };
            if sku.is_empty() {
                return Err(Error::validation(format!("missing SKU in '{entry}'")));
            }
            let quantity = quantity.parse::<i64>().map_err(|_| {
                Error::validation(format!("'{quantity}' is not a whole number (in '{entry}')"))
            })?;
            Ok(LineItem::new(sku, "", quantity))
        })
        .collect()
}

/// One line per item: `• Part A (A) ×3`.
#[must_use]
pub fn format_items(items: &[LineItem]) -> String {
    if items.is_empty() {
        return "(no items)".to_string();
    }
    items
        .iter()
        .map(|item| format!("• {} (`{}`) ×{}", item.name, item.sku, item.quantity))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per item showing the ledger effect of approval.
#[must_use]
pub fn format_projection(projections: &[Projection]) -> String {
    projections
        .iter()
        .map(|p| {
            let flag = if p.after < 0 { " ⚠️" } else { "" };
            format!(
                "• `{}` ×{}: {}{flag}",
                p.sku,
                p.quantity,
                dashboard::format_stock_change(p.current, p.after)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per ledger change made by an approval.
#[must_use]
pub fn format_changes(changes: &[StockChange]) -> String {
    changes
        .iter()
        .map(|c| {
            format!(
                "• `{}`: {}",
                c.sku,
                dashboard::format_stock_change(c.before, c.after)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Embed describing one claim or deposit.
#[must_use]
pub fn request_embed(
    label: &str,
    id: &str,
    name: &str,
    team_name: &str,
    status: RequestStatus,
    items: &[LineItem],
) -> serenity::CreateEmbed {
    serenity::CreateEmbed::default()
        .title(format!("{label}: {name}"))
        .color(status_color(status))
        .field("Team", team_name, true)
        .field("Status", status_badge(status), true)
        .field("Items", truncate_field(&format_items(items)), false)
        .footer(serenity::CreateEmbedFooter::new(format!("ID: {id}")))
}

/// Status badge for a claim or deposit.
#[must_use]
pub const fn status_badge(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "🕒 pending",
        RequestStatus::Approved => "✅ approved",
    }
}

/// Embed colour for a claim or deposit.
#[must_use]
pub const fn status_color(status: RequestStatus) -> u32 {
    match status {
        RequestStatus::Pending => PENDING_COLOR,
        RequestStatus::Approved => APPROVED_COLOR,
    }
}

/// Discord caps embed field values at 1024 characters.
#[must_use]
pub fn truncate_field(text: &str) -> String {
    const LIMIT: usize = 1024;
    if text.chars().count() <= LIMIT {
        return text.to_string();
    }
    let mut out: String = text.chars().take(LIMIT - 2).collect();
    out.push_str("\n…");
    out
}

/// Downloads a CSV attachment as text.
pub async fn read_csv_attachment(attachment: &serenity::Attachment) -> Result<String> {
    if attachment.size > MAX_IMPORT_BYTES {
        return Err(Error::validation(format!(
            "'{}' is too large to import ({} bytes)",
            attachment.filename, attachment.size
        )));
    }
    debug!("Downloading attachment {}", attachment.filename);
    let bytes = attachment.download().await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Wraps text as a file attachment.
#[must_use]
pub fn text_attachment(file_name: &str, contents: String) -> serenity::CreateAttachment {
    serenity::CreateAttachment::bytes(contents.into_bytes(), file_name)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_items() {
        let items = parse_items("A:2, B:1\nC").unwrap();
        assert_eq!(
            items,
            vec![
                LineItem::new("A", "", 2),
                LineItem::new("B", "", 1),
                LineItem::new("C", "", 1),
            ]
        );
    }

    #[test]
    fn test_parse_items_keeps_non_positive_for_core() {
        let items = parse_items("A:0, B:-3").unwrap();
        assert_eq!(items[0].quantity, 0);
        assert_eq!(items[1].quantity, -3);
    }

    #[test]
    fn test_parse_items_rejects_junk() {
        assert!(matches!(
            parse_items("A:lots"),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(parse_items(":3"), Err(Error::Validation { .. })));
        assert!(parse_items(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_format_projection_flags_shortfall() {
        let projections = vec![
            Projection {
                sku: "A".to_string(),
                name: "Part A".to_string(),
                quantity: 10,
                current: 4,
                after: -6,
            },
            Projection {
                sku: "B".to_string(),
                name: "Part B".to_string(),
                quantity: 1,
                current: 5,
                after: 4,
            },
        ];
        let text = format_projection(&projections);
        assert!(text.contains("`A` ×10: 4 → -6 ⚠️"));
        assert!(text.ends_with("`B` ×1: 5 → 4"));
    }

    #[test]
    fn test_format_items() {
        assert_eq!(format_items(&[]), "(no items)");
        assert_eq!(
            format_items(&[LineItem::new("A", "Part A", 3)]),
            "• Part A (`A`) ×3"
        );
    }

    #[test]
    fn test_format_changes() {
        let changes = vec![StockChange {
            sku: "X".to_string(),
            before: 0,
            after: -1,
        }];
        assert_eq!(format_changes(&changes), "• `X`: 0 → -1");
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("short"), "short");
        let long = "x".repeat(2000);
        assert_eq!(truncate_field(&long).chars().count(), 1024);
    }

    #[test]
    fn test_import_format_maps_to_shape() {
        assert_eq!(CsvShape::from(ImportFormat::CadExport), CsvShape::CadExport);
        assert_eq!(CsvShape::from(ImportFormat::StockRows), CsvShape::StockRows);
    }
}
