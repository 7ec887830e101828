//! CSV import of claims, deposits and shopping lists.
//!
//! Two row shapes are understood, chosen by the caller:
//! - [`CsvShape::StockRows`]: `sku,quantity,team`
//! - [`CsvShape::CadExport`]: `item,quantity,sku,description` (CAD bill of materials)
//!
//! The first line is always a header. Rows with an empty SKU or quantity, or a
//! SKU the catalog does not know, are dropped silently. A quantity that does
//! not parse counts as 1; a parsed quantity of zero or less drops the row.

use crate::{
    core::{
        catalog::PartCatalog,
        claim, deposit,
        reconcile::RequestDraft,
        shopping::{self, ShoppingListDraft, ShoppingListView},
    },
    entities::{
        Claim, Deposit, LineItem, ShoppingList, claim as claim_entity, deposit as deposit_entity,
        shopping_list,
    },
    errors::Result,
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;
use tracing::{debug, info};

/// Column layout of an imported CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvShape {
    /// `sku,quantity,team`
    #[default]
    StockRows,
    /// `item,quantity,sku,description`
    CadExport,
}

impl CsvShape {
    /// Column indices of (sku, quantity) and the minimum column count.
    const fn layout(self) -> (usize, usize, usize) {
        match self {
            Self::StockRows => (0, 1, 2),
            Self::CadExport => (2, 1, 3),
        }
    }
}

/// Parses a quantity cell the way a lenient spreadsheet would: the leading
/// integer is used, junk counts as 1, and a non-positive or out-of-range number
/// is rejected.
#[must_use]
pub fn parse_quantity(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let end = raw
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && matches!(c, '-' | '+')))
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());

    match raw[..end].parse::<i64>() {
        Ok(quantity) if quantity > 0 => Some(quantity),
        Ok(_) => None,
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            None
        }
        Err(_) => Some(1),
    }
}

/// Parses CSV text into line items named from the catalog.
///
/// # Errors
/// [`crate::errors::Error::Csv`] if the text is not well-formed CSV.
pub fn parse_csv(input: &str, shape: CsvShape, catalog: &PartCatalog) -> Result<Vec<LineItem>> {
    let (sku_col, qty_col, min_cols) = shape.layout();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let mut items = Vec::new();
    for record in reader.records() {
        let record = record?;
        // The stock-rows team column is optional in practice.
        if shape == CsvShape::CadExport && record.len() < min_cols {
            continue;
        }
        let (Some(sku), Some(qty)) = (record.get(sku_col), record.get(qty_col)) else {
            continue;
        };
        if sku.is_empty() || qty.is_empty() {
            continue;
        }
        let Some(part) = catalog.get(sku) else {
            debug!("Dropping unknown SKU {} from import", sku);
            continue;
        };
        let Some(quantity) = parse_quantity(qty) else {
            continue;
        };
        items.push(LineItem::new(sku, part.name.clone(), quantity));
    }
    Ok(items)
}

async fn count_with_prefix<E>(
    db: &DatabaseConnection,
    org_column: E::Column,
    name_column: E::Column,
    org_id: &str,
    prefix: &str,
) -> Result<u64>
where
    E: EntityTrait,
    E::Model: Sync,
{
    Ok(E::find()
        .filter(org_column.eq(org_id))
        .filter(name_column.starts_with(prefix))
        .count(db)
        .await?)
}

fn import_prefix(kind: &str) -> String {
    format!("Imported {kind} {}", Utc::now().format("%Y-%m-%d"))
}

/// Creates a pending claim from CSV. Returns `None` if no row survived.
pub async fn import_claim(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    input: &str,
    shape: CsvShape,
    created_by: &str,
) -> Result<Option<claim_entity::Model>> {
    let items = parse_csv(input, shape, catalog)?;
    if items.is_empty() {
        info!("CSV import produced no claim items");
        return Ok(None);
    }

    let prefix = import_prefix("Claim");
    let existing = count_with_prefix::<Claim>(
        db,
        claim_entity::Column::OrgId,
        claim_entity::Column::Name,
        org_id,
        &prefix,
    )
    .await?;
    let name = format!("{prefix} {}", existing + 1);

    let draft = RequestDraft::new(name.clone(), items)
        .named(name)
        .created_by(created_by);
    claim::create_claim(db, org_id, catalog, &draft).await.map(Some)
}

/// Creates a pending deposit from CSV. Returns `None` if no row survived.
pub async fn import_deposit(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    input: &str,
    shape: CsvShape,
    created_by: &str,
) -> Result<Option<deposit_entity::Model>> {
    let items = parse_csv(input, shape, catalog)?;
    if items.is_empty() {
        info!("CSV import produced no deposit items");
        return Ok(None);
    }

    let prefix = import_prefix("Deposit");
    let existing = count_with_prefix::<Deposit>(
        db,
        deposit_entity::Column::OrgId,
        deposit_entity::Column::Name,
        org_id,
        &prefix,
    )
    .await?;
    let name = format!("{prefix} {}", existing + 1);

    let draft = RequestDraft::new(name.clone(), items)
        .named(name)
        .created_by(created_by);
    deposit::create_deposit(db, org_id, catalog, &draft)
        .await
        .map(Some)
}

/// Creates a user shopping list from CSV. Returns `None` if no row survived.
pub async fn import_shopping_list(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    input: &str,
    shape: CsvShape,
    created_by: &str,
) -> Result<Option<ShoppingListView>> {
    let items = parse_csv(input, shape, catalog)?;
    if items.is_empty() {
        info!("CSV import produced no shopping list items");
        return Ok(None);
    }

    let prefix = import_prefix("List");
    let existing = count_with_prefix::<ShoppingList>(
        db,
        shopping_list::Column::OrgId,
        shopping_list::Column::Name,
        org_id,
        &prefix,
    )
    .await?;

    let draft = ShoppingListDraft {
        name: format!("{prefix} {}", existing + 1),
        description: "Imported from CSV".to_string(),
        items,
        created_by: created_by.to_string(),
    };
    shopping::create_shopping_list(db, org_id, catalog, &draft)
        .await
        .map(Some)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::shopping::{ShoppingListDraft, create_shopping_list, export_csv};
    use crate::entities::RequestStatus;
    use crate::test_utils::*;
    use std::collections::BTreeMap;

    fn pairs(items: &[LineItem]) -> BTreeMap<String, i64> {
        let mut map = BTreeMap::new();
        for item in items {
            *map.entry(item.sku.clone()).or_insert(0) += item.quantity;
        }
        map
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("3"), Some(3));
        assert_eq!(parse_quantity(" 12 "), Some(12));
        assert_eq!(parse_quantity("3.7"), Some(3));
        assert_eq!(parse_quantity("lots"), Some(1));
        assert_eq!(parse_quantity("0"), None);
        assert_eq!(parse_quantity("-2"), None);
        assert_eq!(parse_quantity("99999999999999999999"), None);
        assert_eq!(parse_quantity("-99999999999999999999"), None);
        assert_eq!(parse_quantity("9223372036854775807"), Some(i64::MAX));
    }

    #[test]
    fn test_parse_stock_rows() {
        let catalog = test_catalog();
        let csv = "sku,quantity,team\nA,3,T1\nNOPE,4,T1\n,2,T1\nB,,T1\nC,0,T1\nB, 2 ,T2\n";
        let items = parse_csv(csv, CsvShape::StockRows, &catalog).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], LineItem::new("A", "Part A", 3));
        assert_eq!(items[1], LineItem::new("B", "Part B", 2));
    }

    #[test]
    fn test_parse_cad_export() {
        let catalog = test_catalog();
        let csv = "Item,Quantity,Part number,Description\n\
                   1,4,A,bracket\n\
                   2,x,C,spacer\n\
                   3,2\n\
                   4,1,Z-999,custom plate\n";
        let items = parse_csv(csv, CsvShape::CadExport, &catalog).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], LineItem::new("A", "Part A", 4));
        assert_eq!(items[1], LineItem::new("C", "Part C", 1));
    }

    #[test]
    fn test_header_only_yields_nothing() {
        let catalog = test_catalog();
        assert!(parse_csv("sku,quantity,team\n", CsvShape::StockRows, &catalog)
            .unwrap()
            .is_empty());
        assert!(parse_csv("", CsvShape::StockRows, &catalog).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_then_import_round_trip() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        let list = create_shopping_list(
            &db,
            TEST_ORG,
            &catalog,
            &ShoppingListDraft {
                name: "Order".into(),
                description: String::new(),
                items: vec![LineItem::new("A", "", 3), LineItem::new("B", "", 1)],
                created_by: "tester".into(),
            },
        )
        .await?;

        let exported = export_csv(&list)?;
        let with_team: String = exported
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i == 0 {
                    format!("{line},TEAM\n")
                } else {
                    format!("{line},T1\n")
                }
            })
            .collect();

        let items = parse_csv(&with_team, CsvShape::StockRows, &catalog)?;
        let original: Vec<LineItem> = list.items.iter().map(|i| i.to_line_item()).collect();
        assert_eq!(pairs(&items), pairs(&original));
        Ok(())
    }

    #[tokio::test]
    async fn test_import_claim_names_and_numbers_records() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        let csv = "sku,quantity,team\nA,2,T1\n";

        let first = import_claim(&db, TEST_ORG, &catalog, csv, CsvShape::StockRows, "u1")
            .await?
            .unwrap();
        let second = import_claim(&db, TEST_ORG, &catalog, csv, CsvShape::StockRows, "u1")
            .await?
            .unwrap();

        let prefix = import_prefix("Claim");
        assert_eq!(first.name, format!("{prefix} 1"));
        assert_eq!(second.name, format!("{prefix} 2"));
        assert_eq!(first.team_name, first.name);
        assert_eq!(first.status, RequestStatus::Pending);
        assert!(!first.can_fulfill);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_with_no_usable_rows_creates_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        let csv = "sku,quantity,team\nNOPE,2,T1\n";

        assert!(
            import_deposit(&db, TEST_ORG, &catalog, csv, CsvShape::StockRows, "u1")
                .await?
                .is_none()
        );
        assert!(deposit::list_deposits(&db, TEST_ORG).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_import_shopping_list() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        let csv = "SKU,QTY\nA,3\nB,1\n";

        let list = import_shopping_list(&db, TEST_ORG, &catalog, csv, CsvShape::StockRows, "u1")
            .await?
            .unwrap();
        assert_eq!(list.description, "Imported from CSV");
        assert!(list.name.starts_with("Imported List "));
        assert_eq!(list.items.len(), 2);
        Ok(())
    }
}
