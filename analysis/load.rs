//! # Data Loading Module
//!
//! The single entry point for the user-provided dataset. It reads one sheet of
//! weekly records into a `polars` `DataFrame` without interpreting any column;
//! typing and validation belong to the cleaner.
//!
//! - Spreadsheets (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) are read with
//!   `calamine`. Only the first sheet is used and its first row is the header.
//! - Delimited text (`.csv`, `.tsv`, `.txt`) is read with the `polars` CSV
//!   reader, inferring the schema over the whole file.

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Days, NaiveDate};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// The loaded, uninterpreted table.
pub type RawTable = DataFrame;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to read the spreadsheet: {0}")]
    SpreadsheetError(#[from] calamine::Error),
    #[error(
        "Unsupported input format '{0}'. Expected a spreadsheet (.xlsx, .xls, .ods) or delimited text (.csv, .tsv)."
    )]
    UnsupportedFormat(String),
    #[error("The workbook '{0}' contains no sheets.")]
    NoSheets(String),
    #[error("The input file '{0}' contains a header but no data rows.")]
    EmptyTable(String),
}

/// Loads the first sheet of `path` into a `DataFrame`.
pub fn load_table(path: &Path) -> Result<RawTable, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    log::info!("Loading data from '{}'", path.display());
    let df = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?,
        "csv" => read_delimited(path, b',')?,
        "tsv" | "txt" => read_delimited(path, b'\t')?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    if df.height() == 0 {
        return Err(LoadError::EmptyTable(path.display().to_string()));
    }
    log::info!(
        "Successfully loaded {} rows and {} columns.",
        df.height(),
        df.width()
    );
    Ok(df)
}

fn read_delimited(path: &Path, separator: u8) -> Result<DataFrame, LoadError> {
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(None)
                .with_parse_options(CsvParseOptions::default().with_separator(separator)),
        )
        .finish()?;
    Ok(df)
}

/// How a spreadsheet column is materialised in the `DataFrame`.
enum CellKind {
    Numeric,
    Text,
}

fn read_workbook(path: &Path) -> Result<DataFrame, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| LoadError::NoSheets(path.display().to_string()))?;
    log::debug!("Reading sheet '{first_sheet}'");
    let range = workbook.worksheet_range(&first_sheet)?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|c| c.to_string()).collect(),
        None => return Err(LoadError::EmptyTable(path.display().to_string())),
    };
    let body: Vec<&[Data]> = rows.collect();

    let mut columns = Vec::with_capacity(header.len());
    for (idx, name) in header.iter().enumerate() {
        let cells: Vec<&Data> = body.iter().map(|row| row.get(idx).unwrap_or(&Data::Empty)).collect();
        let column = match classify(&cells) {
            CellKind::Numeric => {
                let values: Vec<Option<f64>> = cells.iter().map(|c| numeric_cell(c)).collect();
                Series::new(name.as_str().into(), values)
            }
            CellKind::Text => {
                let values: Vec<Option<String>> = cells.iter().map(|c| text_cell(c)).collect();
                Series::new(name.as_str().into(), values)
            }
        };
        columns.push(Column::from(column));
    }

    Ok(DataFrame::new(columns)?)
}

/// A column is numeric when every non-empty cell is a number.
fn classify(cells: &[&Data]) -> CellKind {
    let all_numeric = cells.iter().all(|c| {
        matches!(
            c,
            Data::Int(_) | Data::Float(_) | Data::Empty | Data::Error(_)
        )
    });
    if all_numeric {
        CellKind::Numeric
    } else {
        CellKind::Text
    }
}

fn numeric_cell(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(v) => Some(*v as f64),
        Data::Float(v) => Some(*v),
        _ => None,
    }
}

fn text_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map(|d| d.to_string()),
        Data::DateTimeIso(iso) => Some(iso.clone()),
        other => {
            let text = other.to_string();
            if text.trim().is_empty() { None } else { Some(text) }
        }
    }
}

/// Converts a spreadsheet serial day number (1900 date system) to a date.
/// The fractional part (time of day) is discarded.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use tempfile::Builder;

    fn create_test_file(suffix: &str, content: &str) -> io::Result<tempfile::NamedTempFile> {
        let mut file = Builder::new().suffix(suffix).tempfile()?;
        writeln!(file, "{}", content)?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_csv_keeps_all_columns() {
        let content = "Week Ending Date,Jurisdiction of Occurrence,All Cause,COVID-19\n\
                       2020-01-04,United States,60000,\n\
                       2020-01-11,United States,61000,3";
        let file = create_test_file(".csv", content).unwrap();
        let df = load_table(file.path()).unwrap();

        assert_eq!(df.shape(), (2, 4));
        let covid = df.column("COVID-19").unwrap();
        assert_eq!(covid.null_count(), 1);
    }

    #[test]
    fn test_load_tsv_uses_tab_separator() {
        let content = "Week Ending Date\tAll Cause\n2020-01-04\t1\n2020-01-11\t2";
        let file = create_test_file(".tsv", content).unwrap();
        let df = load_table(file.path()).unwrap();
        assert_eq!(df.shape(), (2, 2));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = load_table(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoadError::IoError(_)), "got {err:?}");
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let file = create_test_file(".parquet", "a,b").unwrap();
        match load_table(file.path()) {
            Err(LoadError::UnsupportedFormat(ext)) => assert_eq!(ext, "parquet"),
            other => panic!("Expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let file = create_test_file(".csv", "Week Ending Date,All Cause").unwrap();
        assert!(matches!(
            load_table(file.path()),
            Err(LoadError::EmptyTable(_))
        ));
    }

    #[test]
    fn test_load_xlsx_with_date_cells() {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("weekly.xlsx");
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let header = [
            "Jurisdiction of Occurrence",
            "Week Ending Date",
            "All Cause",
            "COVID-19 (U071, Underlying Cause of Death)",
        ];
        for (col, name) in header.iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        // Newest week first; the COVID-19 cell of the middle row is left blank.
        let rows = [
            ((2020, 1, 18), 61500.0, Some(4.0)),
            ((2020, 1, 4), 60000.0, None),
            ((2020, 1, 11), 61000.0, Some(2.0)),
        ];
        for (i, ((y, m, d), all_cause, covid)) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, "United States").unwrap();
            let date = ExcelDateTime::from_ymd(*y, *m, *d).unwrap();
            sheet.write_datetime_with_format(row, 1, &date, &date_format).unwrap();
            sheet.write_number(row, 2, *all_cause).unwrap();
            if let Some(value) = covid {
                sheet.write_number(row, 3, *value).unwrap();
            }
        }
        workbook.save(&path).unwrap();

        let df = load_table(&path).unwrap();
        assert_eq!(df.shape(), (3, 4));
        let dates = df.column("Week Ending Date").unwrap();
        assert_eq!(dates.dtype(), &DataType::String);
        let first: Vec<Option<&str>> = dates.str().unwrap().into_iter().collect();
        assert_eq!(first[0], Some("2020-01-18"));
        assert_eq!(df.column("All Cause").unwrap().dtype(), &DataType::Float64);
        let covid = df
            .column("COVID-19 (U071, Underlying Cause of Death)")
            .unwrap();
        assert_eq!(covid.dtype(), &DataType::Float64);
        assert_eq!(covid.null_count(), 1);

        let table =
            crate::clean::clean(df, &crate::schema::SchemaConfig::default(), Some("United States"))
                .unwrap();
        assert_eq!(
            table.dates,
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 4).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 11).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 18).unwrap(),
            ]
        );
        let covid = table
            .measure("COVID-19 (U071, Underlying Cause of Death)")
            .unwrap();
        assert_eq!(covid.values, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_excel_serial_dates() {
        assert_eq!(
            excel_serial_to_date(43834.0),
            NaiveDate::from_ymd_opt(2020, 1, 4)
        );
        assert_eq!(
            excel_serial_to_date(43834.75),
            NaiveDate::from_ymd_opt(2020, 1, 4)
        );
        assert_eq!(excel_serial_to_date(-1.0), None);
    }
}
