use crate::cell::CellValue;
use crate::error::{Error, Result};
use crate::inventory::{DailyAggregate, InventoryRow};

/// Convert a day table to CSV format
///
/// The header row carries the sheet's column names; values containing commas,
/// quotes or newlines are quoted with doubled inner quotes.
///
/// # Examples
/// ```
/// use wms_lookup::downloader::table_to_csv;
///
/// let csv = table_to_csv(&["codigo".to_string()], &[]);
/// assert_eq!(csv, "codigo\n");
/// ```
pub fn table_to_csv(columns: &[String], rows: &[InventoryRow]) -> String {
    let mut csv_content = String::new();
    push_csv_line(&mut csv_content, columns.iter().map(String::as_str));

    for row in rows {
        let values: Vec<String> = columns.iter().map(|c| row.value(c).to_string()).collect();
        push_csv_line(&mut csv_content, values.iter().map(String::as_str));
    }

    csv_content
}

/// Convert a daily series to CSV with `Data` and `Estoque` columns.
pub fn series_to_csv(series: &[DailyAggregate]) -> String {
    let mut csv_content = String::from("Data,Estoque\n");
    for point in series {
        csv_content.push_str(&format!(
            "{},{}\n",
            point.date.format("%Y-%m-%d"),
            point.total_quantity
        ));
    }
    csv_content
}

fn push_csv_line<'a>(out: &mut String, values: impl Iterator<Item = &'a str>) {
    for (i, value) in values.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if value.contains(',') || value.contains('"') || value.contains('\n') {
            out.push_str(&format!("\"{}\"", value.replace('"', "\"\"")));
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}

/// Convert a day table to XLSX format
///
/// Numbers stay numeric; timestamps and text are written as strings.
#[cfg(feature = "web")]
pub fn table_to_xlsx(columns: &[String], rows: &[InventoryRow]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let xlsx_err = |e: rust_xlsxwriter::XlsxError| Error::Export(e.to_string());

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("WMS").map_err(xlsx_err)?;

    for (c, name) in columns.iter().enumerate() {
        worksheet
            .write_string(0, c as u16, name.as_str())
            .map_err(xlsx_err)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, name) in columns.iter().enumerate() {
            let c = c as u16;
            match row.value(name) {
                CellValue::Empty => {}
                CellValue::Int(i) => {
                    worksheet.write_number(r, c, i as f64).map_err(xlsx_err)?;
                }
                CellValue::Float(f) => {
                    worksheet.write_number(r, c, f).map_err(xlsx_err)?;
                }
                other => {
                    worksheet
                        .write_string(r, c, other.to_string().as_str())
                        .map_err(xlsx_err)?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().map_err(xlsx_err)
}

/// Convert a daily series to XLSX format
#[cfg(feature = "web")]
pub fn series_to_xlsx(series: &[DailyAggregate]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let xlsx_err = |e: rust_xlsxwriter::XlsxError| Error::Export(e.to_string());

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.write_string(0, 0, "Data").map_err(xlsx_err)?;
    worksheet.write_string(0, 1, "Estoque").map_err(xlsx_err)?;

    for (i, point) in series.iter().enumerate() {
        let r = (i + 1) as u32;
        let date = point.date.format("%Y-%m-%d").to_string();
        worksheet
            .write_string(r, 0, date.as_str())
            .map_err(xlsx_err)?;
        worksheet
            .write_number(r, 1, point.total_quantity)
            .map_err(xlsx_err)?;
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().map_err(xlsx_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(code: u64, description: &str) -> InventoryRow {
        let saved_at = NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        InventoryRow {
            code,
            description: description.to_string(),
            quantity: 2.5,
            address: None,
            saved_at,
            saved_date: saved_at.date(),
            extra: Default::default(),
        }
    }

    #[test]
    fn csv_escapes_special_characters() {
        let columns = vec!["codigo".to_string(), "Descrição".to_string(), "Qtd".to_string()];
        let csv = table_to_csv(&columns, &[row(7, "Cabo \"flex\", 2mm")]);
        assert_eq!(
            csv,
            "codigo,Descrição,Qtd\n7,\"Cabo \"\"flex\"\", 2mm\",2.5\n"
        );
    }

    #[test]
    fn series_csv() {
        let series = vec![DailyAggregate {
            date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            total_quantity: 8.0,
        }];
        assert_eq!(series_to_csv(&series), "Data,Estoque\n2024-10-01,8\n");
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_export_produces_a_zip_container() {
        let columns = vec!["codigo".to_string(), "datasalva".to_string()];
        let bytes = table_to_xlsx(&columns, &[row(1, "x")]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
