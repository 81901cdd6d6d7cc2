//! Typed inventory records and the tables they are built from.

use crate::cell::CellValue;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

// Column names as they appear in the WMS sheet. Matched exactly.
pub const COL_SAVED_AT: &str = "datasalva";
pub const COL_QUANTITY: &str = "Qtd";
pub const COL_CODE: &str = "codigo";
pub const COL_DESCRIPTION: &str = "Descrição";
pub const COL_ADDRESS: &str = "Endereço";

/// Columns every snapshot must carry, in the order they are reported when missing.
pub const REQUIRED_COLUMNS: [&str; 4] = [COL_SAVED_AT, COL_QUANTITY, COL_CODE, COL_DESCRIPTION];

/// Columns that are never useful for lookups and are dropped when present.
pub const DROPPED_COLUMNS: [&str; 2] = ["Lote", "Almoxarifado"];

/// A sheet as read from disk: a header row plus untyped cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        RawTable { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at `(row, col)`. Short rows read as empty past their end.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(EMPTY)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// One normalized spreadsheet record.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct InventoryRow {
    pub code: u64,
    pub description: String,
    pub quantity: f64,
    /// `None` when the sheet has no address column or the cell is blank.
    pub address: Option<String>,
    pub saved_at: NaiveDateTime,
    pub saved_date: NaiveDate,
    /// Every other retained column, keyed by header.
    pub extra: BTreeMap<String, CellValue>,
}

impl InventoryRow {
    /// The row's value under a sheet column name.
    pub fn value(&self, column: &str) -> CellValue {
        match column {
            COL_SAVED_AT => CellValue::DateTime(self.saved_at),
            COL_QUANTITY => CellValue::Float(self.quantity),
            COL_CODE => i64::try_from(self.code)
                .map(CellValue::Int)
                .unwrap_or(CellValue::Float(self.code as f64)),
            COL_DESCRIPTION => CellValue::Text(self.description.clone()),
            COL_ADDRESS => match &self.address {
                Some(a) => CellValue::Text(a.clone()),
                None => CellValue::Empty,
            },
            other => self.extra.get(other).cloned().unwrap_or(CellValue::Empty),
        }
    }
}

/// A normalized, read-only table of inventory rows.
#[derive(Clone, Serialize, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Retained column headers, in sheet order.
    pub columns: Vec<String>,
    pub rows: Vec<InventoryRow>,
}

impl Snapshot {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn has_address(&self) -> bool {
        self.has_column(COL_ADDRESS)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// New snapshot with the same columns and only the rows matching `keep`.
    pub fn filtered<F>(&self, keep: F) -> Snapshot
    where
        F: Fn(&InventoryRow) -> bool,
    {
        Snapshot {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Renders the snapshot back into raw cells, column order preserved.
    ///
    /// The derived date is not emitted; it is recomputed from `datasalva`.
    pub fn to_table(&self) -> RawTable {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|col| row.value(col))
                    .collect()
            })
            .collect();

        RawTable::new(self.columns.clone(), rows)
    }
}

/// Sum of quantities for one calendar day.
#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total_quantity: f64,
}
