// src/inventory.rs

use crate::aggregate::OrderSummary;
use crate::config::{InventoryConfig, column_index};
use crate::error::{Error, Result};
use crate::tables::{Cell, Table};
use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;
use tracing::{debug, info, warn};

/// Column B.
pub const ALIAS_COL: usize = 1;
/// Column D.
pub const STOCK_COL: usize = 3;
/// Column E.
pub const POST_COL: usize = 4;
pub const MIN_COLUMNS: usize = 5;

const VARIANT_MARKER: &str = "variant:";

/// The raw first worksheet of an inventory file, anchored at A1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventorySheet {
    pub rows: Vec<Vec<Cell>>,
    pub width: usize,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub table: Table,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub decremented_sets: f64,
}

/// Read the first worksheet, padding it so that column indices are absolute.
pub fn read_inventory(path: &Path) -> Result<InventorySheet> {
    let read_err = |message: String| Error::SpreadsheetRead {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| read_err(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| read_err("workbook has no worksheets".to_string()))?
        .map_err(|e| read_err(e.to_string()))?;

    let Some((start_row, start_col)) = range.start() else {
        return Ok(InventorySheet::default());
    };
    let (start_row, start_col) = (start_row as usize, start_col as usize);
    let width = start_col + range.width();

    let mut rows = vec![vec![Cell::Empty; width]; start_row];
    for raw in range.rows() {
        let mut row = vec![Cell::Empty; start_col];
        row.extend(raw.iter().map(data_to_cell));
        rows.push(row);
    }

    info!(path = %path.display(), rows = rows.len(), columns = width, "Inventory loaded");
    Ok(InventorySheet { rows, width })
}

fn data_to_cell(d: &Data) -> Cell {
    match d {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(n) => Cell::Int(*n),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => Cell::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{e:?}")),
    }
}

/// Lower-case, cut at "variant:", collapse whitespace, trim. Idempotent.
pub fn normalize_alias(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let head = match lower.find(VARIANT_MARKER) {
        Some(pos) => &lower[..pos],
        None => lower.as_str(),
    };
    head.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Numeric stock; anything else counts as zero.
pub fn stock_value(cell: &Cell) -> f64 {
    match cell {
        Cell::Int(n) => *n as f64,
        Cell::Float(f) => *f,
        Cell::Text(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        Cell::Empty => 0.0,
    }
}

fn is_numeric(cell: &Cell) -> bool {
    match cell {
        Cell::Int(_) | Cell::Float(_) => true,
        Cell::Text(s) => s.trim().replace(',', ".").parse::<f64>().is_ok(),
        Cell::Empty => false,
    }
}

fn cell_string(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Int(n) => n.to_string(),
        Cell::Float(f) => f.to_string(),
        Cell::Empty => String::new(),
    }
}

fn number_cell(value: f64) -> Cell {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Cell::Int(value as i64)
    } else {
        Cell::Float(value)
    }
}

/// Matching texts of every bedding record: "category name" and
/// "name category", normalized, paired with the record's set count.
fn bedding_candidates(summary: &OrderSummary) -> Vec<(String, String, u64)> {
    summary
        .records
        .iter()
        .filter(|r| r.bedding)
        .map(|r| {
            let forward = normalize_alias(&format!("{} {}", r.key.category, r.key.name));
            let reverse = normalize_alias(&format!("{} {}", r.key.name, r.key.category));
            (forward, reverse, r.sets)
        })
        .collect()
}

/// Sets ordered for `alias`: the sum over every bedding record whose text
/// contains the normalized alias. `None` when nothing matches.
pub fn sets_for_alias(summary: &OrderSummary, alias: &str) -> Option<u64> {
    sets_for_normalized(&bedding_candidates(summary), &normalize_alias(alias))
}

fn sets_for_normalized(candidates: &[(String, String, u64)], alias: &str) -> Option<u64> {
    if alias.is_empty() {
        return None;
    }
    let matches: Vec<u64> = candidates
        .iter()
        .filter(|(fwd, rev, _)| fwd.contains(alias) || rev.contains(alias))
        .map(|(_, _, sets)| *sets)
        .collect();
    if matches.is_empty() {
        None
    } else {
        Some(matches.iter().sum())
    }
}

fn check_layout(sheet: &InventorySheet, cfg: &InventoryConfig) -> Result<()> {
    if sheet.width < MIN_COLUMNS {
        return Err(Error::MalformedInventory(format!(
            "expected at least {MIN_COLUMNS} columns (alias in B, stock in D, result in E), found {}",
            sheet.width
        )));
    }

    if cfg.expected_headers.is_empty() {
        return Ok(());
    }
    let header = sheet.rows.first().ok_or_else(|| {
        Error::MalformedInventory("expected a header row but the sheet is empty".into())
    })?;
    for (column, expected) in &cfg.expected_headers {
        let idx = column_index(column)
            .ok_or_else(|| Error::Config(format!("{column:?} is not a column letter")))?;
        let actual = header.get(idx).map(cell_string).unwrap_or_default();
        if !actual.to_lowercase().contains(&expected.to_lowercase()) {
            return Err(Error::MalformedInventory(format!(
                "column {column} header is {actual:?}, expected it to contain {expected:?}"
            )));
        }
    }
    Ok(())
}

/// Whether row 1 is a header. Without an explicit setting, it is one when
/// its stock cell holds non-numeric text and its alias matches no ordered set.
fn has_header_row(
    sheet: &InventorySheet,
    cfg: &InventoryConfig,
    candidates: &[(String, String, u64)],
) -> bool {
    if let Some(explicit) = cfg.header_row {
        return explicit;
    }
    if !cfg.expected_headers.is_empty() {
        return true;
    }
    let Some(first) = sheet.rows.first() else {
        return false;
    };
    let textual_stock = first
        .get(STOCK_COL)
        .is_some_and(|c| matches!(c, Cell::Text(s) if !s.trim().is_empty()) && !is_numeric(c));
    let alias = first
        .get(ALIAS_COL)
        .map(|c| normalize_alias(&cell_string(c)))
        .unwrap_or_default();
    textual_stock && sets_for_normalized(candidates, &alias).is_none()
}

/// Decrement stock by the sets ordered, writing the result into column E.
pub fn reconcile(
    sheet: &InventorySheet,
    summary: &OrderSummary,
    cfg: &InventoryConfig,
) -> Result<Reconciled> {
    check_layout(sheet, cfg)?;

    let candidates = bedding_candidates(summary);
    let header_row = has_header_row(sheet, cfg, &candidates);

    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(sheet.rows.len());
    let mut matched_rows = 0;
    let mut unmatched_rows = 0;
    let mut decremented_sets = 0.0;

    for (i, raw) in sheet.rows.iter().enumerate() {
        let mut row = raw.clone();
        row.resize(sheet.width, Cell::Empty);

        if i == 0 && header_row {
            if row[POST_COL] == Cell::Empty {
                row[POST_COL] = Cell::text(&cfg.post_header);
            }
            rows.push(row);
            continue;
        }

        let alias = normalize_alias(&cell_string(&row[ALIAS_COL]));
        if alias.is_empty() {
            rows.push(row);
            continue;
        }

        let stock = stock_value(&row[STOCK_COL]);
        let post = match sets_for_normalized(&candidates, &alias) {
            Some(sets) => {
                matched_rows += 1;
                decremented_sets += sets as f64;
                debug!(alias = %alias, stock, sets, "Alias matched");
                stock - sets as f64
            }
            None => {
                unmatched_rows += 1;
                debug!(alias = %alias, "Alias not found in order");
                stock
            }
        };
        row[POST_COL] = number_cell(post);
        rows.push(row);
    }

    if matched_rows == 0 && !candidates.is_empty() {
        warn!("No inventory alias matched any ordered bedding set");
    }
    info!(matched_rows, unmatched_rows, decremented_sets, "Inventory reconciled");

    // the output keeps the sheet's own layout: no separate header row
    let table = Table {
        headers: Vec::new(),
        rows,
    };
    Ok(Reconciled {
        table,
        matched_rows,
        unmatched_rows,
        decremented_sets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregatedRecord;
    use crate::heuristics::ProductKey;
    use indexmap::IndexMap;

    fn record(category: &str, name: &str, sets: u64, bedding: bool) -> AggregatedRecord {
        AggregatedRecord {
            key: ProductKey {
                category: category.into(),
                name: name.into(),
                pack: 1,
            },
            tag: "bedding".into(),
            counts: IndexMap::new(),
            sets,
            bedding,
        }
    }

    fn summary() -> OrderSummary {
        OrderSummary {
            records: vec![
                record("obliečky", "saténové", 2, true),
                record("Bavlnené obliečky", "Kvet modrý", 3, true),
                record("Bavlnené obliečky", "Kvet ružový", 1, true),
                record("Deka", "saténové", 7, false),
            ],
            dimensions: Vec::new(),
        }
    }

    fn row(alias: &str, stock: Cell) -> Vec<Cell> {
        vec![
            Cell::text("SKU"),
            Cell::text(alias),
            Cell::Empty,
            stock,
            Cell::Empty,
        ]
    }

    fn sheet(rows: Vec<Vec<Cell>>) -> InventorySheet {
        InventorySheet { width: 5, rows }
    }

    #[test]
    fn test_normalize_alias() {
        assert_eq!(normalize_alias("  Saténové   OBLIEČKY "), "saténové obliečky");
        assert_eq!(normalize_alias("Kvet modrý Variant: 140x200"), "kvet modrý");
        assert_eq!(normalize_alias("VARIANT: only"), "");
    }

    #[test]
    fn test_normalize_alias_idempotent() {
        for raw in ["  A  b\tC ", "x variant: y", "Plain", ""] {
            let once = normalize_alias(raw);
            assert_eq!(normalize_alias(&once), once);
        }
    }

    #[test]
    fn test_example_alias_decrements_stock() {
        let s = sheet(vec![row("saténové obliečky", Cell::Int(50))]);
        let out = reconcile(&s, &summary(), &InventoryConfig::default()).unwrap();
        assert_eq!(out.table.rows[0][POST_COL], Cell::Int(48));
        assert_eq!(out.matched_rows, 1);
    }

    #[test]
    fn test_sum_all_matches() {
        // matches both "Kvet" records, not the non-bedding "Deka"
        assert_eq!(sets_for_alias(&summary(), "bavlnené obliečky kvet"), Some(4));
        assert_eq!(sets_for_alias(&summary(), "Kvet modrý variant: L"), Some(3));
        assert_eq!(sets_for_alias(&summary(), "froté"), None);
        assert_eq!(sets_for_alias(&summary(), "   "), None);
    }

    #[test]
    fn test_unmatched_and_non_numeric_stock() {
        let s = sheet(vec![
            row("neexistuje", Cell::Float(12.5)),
            row("saténové", Cell::text("n/a")),
            row("", Cell::Int(9)),
        ]);
        let out = reconcile(&s, &summary(), &InventoryConfig::default()).unwrap();
        assert_eq!(out.table.rows[0][POST_COL], Cell::Float(12.5));
        assert_eq!(out.table.rows[1][POST_COL], Cell::Int(-2));
        // empty alias: row untouched
        assert_eq!(out.table.rows[2][POST_COL], Cell::Empty);
        assert_eq!(out.unmatched_rows, 1);
    }

    #[test]
    fn test_header_row_is_preserved() {
        let s = sheet(vec![
            vec![
                Cell::text("Kód"),
                Cell::text("Alias"),
                Cell::text("Popis"),
                Cell::text("Sklad"),
                Cell::Empty,
            ],
            row("saténové obliečky", Cell::text("50")),
        ]);
        let out = reconcile(&s, &summary(), &InventoryConfig::default()).unwrap();
        assert_eq!(out.table.rows[0][POST_COL], Cell::text("Po odečtu"));
        assert_eq!(out.table.rows[0][ALIAS_COL], Cell::text("Alias"));
        assert_eq!(out.table.rows[1][POST_COL], Cell::Int(48));
    }

    #[test]
    fn test_first_row_with_text_stock_is_data_when_alias_matches() {
        let s = sheet(vec![
            row("saténové obliečky", Cell::text("n/a")),
            row("kvet modrý", Cell::Int(10)),
        ]);
        let out = reconcile(&s, &summary(), &InventoryConfig::default()).unwrap();
        assert_eq!(out.table.rows[0][POST_COL], Cell::Int(-2));
        assert_eq!(out.table.rows[1][POST_COL], Cell::Int(7));
        assert_eq!(out.matched_rows, 2);
    }

    #[test]
    fn test_header_row_setting_overrides_detection() {
        let s = sheet(vec![
            row("neexistuje", Cell::text("n/a")),
            row("saténové obliečky", Cell::Int(50)),
        ]);
        let detected = reconcile(&s, &summary(), &InventoryConfig::default()).unwrap();
        assert_eq!(detected.table.rows[0][POST_COL], Cell::text("Po odečtu"));

        let cfg = InventoryConfig {
            header_row: Some(false),
            ..InventoryConfig::default()
        };
        let out = reconcile(&s, &summary(), &cfg).unwrap();
        assert_eq!(out.table.rows[0][POST_COL], Cell::Int(0));
        assert_eq!(out.table.rows[1][POST_COL], Cell::Int(48));
        assert_eq!(out.unmatched_rows, 1);
    }

    #[test]
    fn test_too_few_columns_is_fatal() {
        let s = InventorySheet {
            width: 4,
            rows: vec![vec![Cell::Empty, Cell::text("x"), Cell::Empty, Cell::Int(1)]],
        };
        let err = reconcile(&s, &summary(), &InventoryConfig::default()).unwrap_err();
        assert!(err.is_malformed_inventory());
    }

    #[test]
    fn test_expected_headers_fail_fast() {
        let mut cfg = InventoryConfig::default();
        cfg.expected_headers.insert("B".into(), "alias".into());
        cfg.expected_headers.insert("D".into(), "sklad".into());

        let good = sheet(vec![vec![
            Cell::Empty,
            Cell::text("Alias produktu"),
            Cell::Empty,
            Cell::text("Sklad ks"),
            Cell::Empty,
        ]]);
        assert!(reconcile(&good, &summary(), &cfg).is_ok());

        let bad = sheet(vec![row("saténové obliečky", Cell::Int(50))]);
        let err = reconcile(&bad, &summary(), &cfg).unwrap_err();
        assert!(err.is_malformed_inventory());
    }
}
