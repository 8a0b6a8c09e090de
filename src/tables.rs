// src/tables.rs

use crate::aggregate::{AggregatedRecord, OrderSummary};
use crate::config::TablesConfig;

/// A single output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn uint(n: u64) -> Self {
        Cell::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// Flat table: one header row plus data rows of the same width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// The two order tables.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTables {
    pub bedding: Table,
    pub other: Table,
}

/// Split the summary into the bedding-set table and the other-merchandise
/// table, both sorted by category then name.
pub fn partition(summary: &OrderSummary, cfg: &TablesConfig) -> OrderTables {
    let mut records: Vec<&AggregatedRecord> = summary.records.iter().collect();
    // stable: equal (category, name) keep insertion order
    records.sort_by(|a, b| {
        a.key
            .category
            .cmp(&b.key.category)
            .then_with(|| a.key.name.cmp(&b.key.name))
    });

    let (bedding, other): (Vec<&AggregatedRecord>, Vec<&AggregatedRecord>) =
        records.into_iter().partition(|r| r.bedding);

    OrderTables {
        bedding: bedding_table(&bedding, cfg),
        other: other_table(&other, &summary.dimensions, cfg),
    }
}

fn key_cells(r: &AggregatedRecord) -> Vec<Cell> {
    vec![
        Cell::text(&r.key.category),
        Cell::text(&r.key.name),
        Cell::Int(i64::from(r.key.pack)),
    ]
}

fn bedding_table(records: &[&AggregatedRecord], cfg: &TablesConfig) -> Table {
    let labels = &cfg.labels;
    let dims = &cfg.bedding_dimensions;

    let mut headers = vec![labels.category.clone(), labels.name.clone(), labels.pack.clone()];
    headers.extend(dims.iter().cloned());
    headers.push(labels.row_total.clone());
    headers.push(labels.sets.clone());

    let mut column_sums = vec![0u64; dims.len()];
    let mut grand_total = 0u64;
    let mut sets_total = 0u64;
    let mut rows = Vec::with_capacity(records.len() + 1);

    for r in records {
        let mut row = key_cells(r);
        let mut row_total = 0;
        for (i, label) in dims.iter().enumerate() {
            let n = r.count(label);
            column_sums[i] += n;
            row_total += n;
            row.push(Cell::uint(n));
        }
        grand_total += row_total;
        sets_total += r.sets;
        row.push(Cell::uint(row_total));
        row.push(Cell::uint(r.sets));
        rows.push(row);
    }

    if !records.is_empty() {
        let mut totals = vec![Cell::text(&labels.totals_row), Cell::Empty, Cell::Empty];
        totals.extend(column_sums.into_iter().map(Cell::uint));
        totals.push(Cell::uint(grand_total));
        totals.push(Cell::uint(sets_total));
        rows.push(totals);
    }

    Table { headers, rows }
}

fn other_table(records: &[&AggregatedRecord], dimensions: &[String], cfg: &TablesConfig) -> Table {
    let labels = &cfg.labels;
    let mut headers = vec![labels.category.clone(), labels.name.clone(), labels.pack.clone()];
    headers.extend(dimensions.iter().cloned());

    let rows = records
        .iter()
        .map(|r| {
            let mut row = key_cells(r);
            row.extend(dimensions.iter().map(|d| Cell::uint(r.count(d))));
            row
        })
        .collect();

    Table { headers, rows }
}
