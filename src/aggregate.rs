use crate::inventory::{DailyAggregate, InventoryRow, Snapshot};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Sums quantity per calendar day, optionally for a single item code.
///
/// The result is ordered by date ascending and is empty when no row matches.
pub fn aggregate_daily(rows: &[InventoryRow], code: Option<u64>) -> Vec<DailyAggregate> {
    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows.iter().filter(|r| code.is_none_or(|c| r.code == c)) {
        *per_day.entry(row.saved_date).or_insert(0.0) += row.quantity;
    }

    per_day
        .into_iter()
        .map(|(date, total_quantity)| DailyAggregate {
            date,
            total_quantity,
        })
        .collect()
}

pub fn total_quantity(series: &[DailyAggregate]) -> f64 {
    series.iter().map(|d| d.total_quantity).sum()
}

pub fn rows_on(snapshot: &Snapshot, date: NaiveDate) -> Snapshot {
    snapshot.filtered(|r| r.saved_date == date)
}

pub fn rows_in_month(snapshot: &Snapshot, year: i32, month: u32) -> Snapshot {
    snapshot.filtered(|r| r.saved_date.year() == year && r.saved_date.month() == month)
}

/// Years present in the data, newest first.
pub fn available_years(snapshot: &Snapshot) -> Vec<i32> {
    let years: BTreeSet<i32> = snapshot.rows.iter().map(|r| r.saved_date.year()).collect();
    years.into_iter().rev().collect()
}

/// Months with data in `year`, ascending.
pub fn available_months(snapshot: &Snapshot, year: i32) -> Vec<u32> {
    let months: BTreeSet<u32> = snapshot
        .rows
        .iter()
        .filter(|r| r.saved_date.year() == year)
        .map(|r| r.saved_date.month())
        .collect();
    months.into_iter().collect()
}

/// Everything the daily lookup shows for one item.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct ItemSummary {
    pub code: u64,
    pub description: String,
    pub total_quantity: f64,
    /// Distinct storage addresses, in the order first seen.
    pub addresses: Vec<String>,
    pub rows: Vec<InventoryRow>,
}

/// Collects the rows for `code`; `None` when the item has no rows.
pub fn summarize_item(rows: &[InventoryRow], code: u64) -> Option<ItemSummary> {
    let matching: Vec<InventoryRow> = rows.iter().filter(|r| r.code == code).cloned().collect();
    let first = matching.first()?;

    let mut addresses: Vec<String> = Vec::new();
    for address in matching.iter().filter_map(|r| r.address.as_ref()) {
        if !addresses.contains(address) {
            addresses.push(address.clone());
        }
    }

    Some(ItemSummary {
        code,
        description: first.description.clone(),
        total_quantity: matching.iter().map(|r| r.quantity).sum(),
        addresses,
        rows: matching,
    })
}
