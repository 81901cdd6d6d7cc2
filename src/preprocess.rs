//! Turns a raw sheet into a typed [`Snapshot`].

use crate::cell::{CellValue, excel_serial_to_datetime};
use crate::error::{Error, Result};
use crate::inventory::{
    COL_ADDRESS, COL_CODE, COL_DESCRIPTION, COL_QUANTITY, COL_SAVED_AT, DROPPED_COLUMNS,
    InventoryRow, REQUIRED_COLUMNS, RawTable, Snapshot,
};
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use std::collections::BTreeMap;

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Normalize a raw table into a snapshot.
///
/// 1. drop columns whose every cell is empty
/// 2. drop `Lote` / `Almoxarifado`
/// 3. require `datasalva`, `Qtd`, `codigo`, `Descrição`
/// 4. parse `datasalva`, dropping rows that do not parse
/// 5. derive the calendar date
/// 6. coerce `Qtd`, dropping rows without a number
/// 7. coerce `codigo`, defaulting to 0
/// 8. drop optional columns left empty by the row filtering
///
/// # Errors
/// * `Error::Schema` listing every required column that is absent
pub fn normalize(table: &RawTable) -> Result<Snapshot> {
    let kept: Vec<usize> = (0..table.headers.len())
        .filter(|&col| !is_empty_column(table, col))
        .filter(|&col| !DROPPED_COLUMNS.contains(&table.headers[col].as_str()))
        .collect();

    let has = |name: &str| kept.iter().any(|&c| table.headers[c] == name);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !has(name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::Schema { missing });
    }

    let find = |name: &str| {
        kept.iter()
            .copied()
            .find(|&c| table.headers[c] == name)
            .unwrap_or(usize::MAX)
    };
    let saved_at_col = find(COL_SAVED_AT);
    let quantity_col = find(COL_QUANTITY);
    let code_col = find(COL_CODE);
    let description_col = find(COL_DESCRIPTION);
    let address_col = kept
        .iter()
        .copied()
        .find(|&c| table.headers[c] == COL_ADDRESS);
    let extra_cols: Vec<usize> = kept
        .iter()
        .copied()
        .filter(|&c| !is_typed_column(&table.headers[c]))
        .collect();

    let mut rows = Vec::with_capacity(table.height());
    let mut bad_timestamps = 0usize;
    let mut bad_quantities = 0usize;

    for r in 0..table.height() {
        let Some(saved_at) = parse_timestamp(table.cell(r, saved_at_col)) else {
            bad_timestamps += 1;
            continue;
        };
        let Some(quantity) = table.cell(r, quantity_col).as_f64() else {
            bad_quantities += 1;
            continue;
        };

        let address = address_col.and_then(|c| match table.cell(r, c) {
            CellValue::Empty => None,
            other => Some(other.to_string()),
        });

        let extra: BTreeMap<String, CellValue> = extra_cols
            .iter()
            .map(|&c| (table.headers[c].clone(), table.cell(r, c).clone()))
            .collect();

        rows.push(InventoryRow {
            code: coerce_code(table.cell(r, code_col)),
            description: table.cell(r, description_col).to_string(),
            quantity,
            address,
            saved_at,
            saved_date: saved_at.date(),
            extra,
        });
    }

    if bad_timestamps > 0 || bad_quantities > 0 {
        debug!(
            "dropped {} rows with unparseable datasalva and {} without Qtd",
            bad_timestamps, bad_quantities
        );
    }

    let mut columns: Vec<String> = kept.iter().map(|&c| table.headers[c].clone()).collect();
    if !rows.is_empty() {
        prune_emptied_columns(&mut columns, &mut rows);
    }

    Ok(Snapshot { columns, rows })
}

/// Parses a save timestamp. Date-only values land at midnight.
pub fn parse_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Float(f) => excel_serial_to_datetime(*f),
        CellValue::Int(i) => excel_serial_to_datetime(*i as f64),
        CellValue::Text(s) => parse_timestamp_text(s.trim()),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

fn parse_timestamp_text(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Item code coercion: numbers truncate, anything missing or negative becomes 0.
pub fn coerce_code(cell: &CellValue) -> u64 {
    match cell.as_f64() {
        Some(f) if f >= 0.0 && f < u64::MAX as f64 => f.trunc() as u64,
        _ => 0,
    }
}

fn is_empty_column(table: &RawTable, col: usize) -> bool {
    table.height() > 0 && (0..table.height()).all(|r| table.cell(r, col).is_empty())
}

fn is_typed_column(name: &str) -> bool {
    REQUIRED_COLUMNS.contains(&name) || name == COL_ADDRESS
}

fn prune_emptied_columns(columns: &mut Vec<String>, rows: &mut [InventoryRow]) {
    let emptied: Vec<String> = columns
        .iter()
        .filter(|name| !REQUIRED_COLUMNS.contains(&name.as_str()))
        .filter(|name| {
            rows.iter().all(|row| {
                if name.as_str() == COL_ADDRESS {
                    row.address.is_none()
                } else {
                    row.extra.get(name.as_str()).is_none_or(CellValue::is_empty)
                }
            })
        })
        .cloned()
        .collect();

    if emptied.is_empty() {
        return;
    }

    columns.retain(|c| !emptied.contains(c));
    for row in rows.iter_mut() {
        row.extra.retain(|k, _| !emptied.contains(k));
    }
}
