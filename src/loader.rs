use crate::cell::CellValue;
use crate::error::{Error, Result};
use crate::inventory::RawTable;
use calamine::{Reader, open_workbook_auto};
use log::debug;
use std::fs::{self, File};
use std::path::Path;
use std::time::SystemTime;

/// Opaque marker of a source file's version. Changes whenever the file is rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FreshnessToken(SystemTime);

impl FreshnessToken {
    pub fn from_time(modified: SystemTime) -> Self {
        FreshnessToken(modified)
    }
}

/// Reads the modification time of `path` as its freshness token.
///
/// # Errors
/// * `Error::NotFound` when the path does not resolve
pub fn freshness_token(path: impl AsRef<Path>) -> Result<FreshnessToken> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).map_err(|_| Error::NotFound(path.to_path_buf()))?;
    let modified = metadata
        .modified()
        .map_err(|e| Error::Read(format!("cannot read modification time: {}", e)))?;
    Ok(FreshnessToken(modified))
}

/// Load a table from a CSV file
///
/// The first record is the header row. Fields are typed with [`CellValue::infer`];
/// quoted fields may contain commas, doubled quotes and line breaks.
///
/// # Examples
/// ```no_run
/// use wms_lookup::loader::from_csv;
///
/// match from_csv("data/WMS.csv") {
///     Ok(table) => println!("Loaded {} rows", table.height()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<RawTable> {
    let path = filepath.as_ref();
    let file = File::open(path).map_err(|_| Error::NotFound(path.to_path_buf()))?;
    let csv_err = |e: csv::Error| Error::Read(e.to_string());

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut records = reader.records().filter(|record| {
        record
            .as_ref()
            .map_or(true, |r| !r.iter().all(|field| field.trim().is_empty()))
    });

    let header = records
        .next()
        .ok_or_else(|| Error::Read("CSV file is empty".to_string()))?
        .map_err(csv_err)?;
    let headers = name_headers(header.iter().enumerate().map(|(i, field)| {
        let field = if i == 0 {
            field.trim_start_matches('\u{feff}')
        } else {
            field
        };
        CellValue::Text(field.to_string())
    }));
    let width = headers.len();

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(csv_err)?;
        let mut row: Vec<CellValue> = record.iter().map(CellValue::infer).collect();
        row.resize(width, CellValue::Empty);
        rows.push(row);
    }

    Ok(RawTable::new(headers, rows))
}

/// Load a table from a named sheet of an Excel or OpenDocument workbook
///
/// # Errors
/// * `Error::NotFound` when the file cannot be opened because it does not exist
/// * `Error::Read` when the workbook is corrupt, the sheet is missing or empty
pub fn from_excel(filepath: impl AsRef<Path>, sheet_name: &str) -> Result<RawTable> {
    let path = filepath.as_ref();
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| Error::Read(e.to_string()))?;
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| Error::Read(format!("sheet '{}': {}", sheet_name, e)))?;

    let mut rows_iter = range.rows();
    let header_row = rows_iter
        .next()
        .ok_or_else(|| Error::Read(format!("sheet '{}' is empty", sheet_name)))?;
    let headers = name_headers(header_row.iter().map(CellValue::from));
    let width = headers.len();

    let rows: Vec<Vec<CellValue>> = rows_iter
        .map(|r| {
            let mut row: Vec<CellValue> = r.iter().map(CellValue::from).collect();
            row.resize(width, CellValue::Empty);
            row
        })
        .filter(|r| !r.iter().all(CellValue::is_empty))
        .collect();

    debug!(
        "read {} rows x {} columns from {}#{}",
        rows.len(),
        width,
        path.display(),
        sheet_name
    );

    Ok(RawTable::new(headers, rows))
}

/// Detect file type and load appropriate format
///
/// CSV files are read directly; workbook formats read `sheet_name`.
pub fn load_table(filepath: impl AsRef<Path>, sheet_name: &str) -> Result<RawTable> {
    let path = filepath.as_ref();
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => from_csv(path),
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("xlsb") | Some("ods") => {
            from_excel(path, sheet_name)
        }
        Some(ext) => Err(Error::Read(format!("unsupported file extension: {}", ext))),
        None => Err(Error::Read("file has no extension".to_string())),
    }
}

// Blank headers get positional names so every column stays addressable.
fn name_headers(cells: impl Iterator<Item = CellValue>) -> Vec<String> {
    cells
        .enumerate()
        .map(|(i, cell)| {
            let name = cell.to_string();
            if name.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name
            }
        })
        .collect()
}
