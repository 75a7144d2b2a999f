//! # Cleaning Stage
//!
//! Turns the raw `DataFrame` into a typed [`MortalityTable`]. The steps run in a
//! fixed order and any failure aborts the run; there is no partial recovery.
//!
//! 1. Trim whitespace from column names.
//! 2. Parse the date column. The first unparsable row is an error.
//! 3. Replace missing values in numeric columns with zero.
//! 4. Optionally keep a single jurisdiction (exact match).
//! 5. Sort ascending by date, keeping input order among equal dates.

use crate::load::{RawTable, excel_serial_to_date};
use crate::schema::{SchemaConfig, SchemaError, resolve_column};
use crate::table::{Measure, MortalityTable, TableError};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use thiserror::Error;

/// Date layouts seen across exports of the weekly mortality data.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y"];
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
];

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("Row {row} of column '{column}' could not be parsed as a date: '{value}'")]
    UnparsableDate {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Row {row} of column '{column}' has no date.")]
    MissingDate { column: String, row: usize },
    #[error("No rows match the jurisdiction '{0}'. Check the spelling against the input file.")]
    NoRowsForJurisdiction(String),
}

/// Runs the full cleaning sequence. `jurisdiction` selects a single
/// jurisdiction; `None` keeps every row.
pub fn clean(
    mut raw: RawTable,
    schema: &SchemaConfig,
    jurisdiction: Option<&str>,
) -> Result<MortalityTable, CleanError> {
    // --- Step 1: column names ---
    let trimmed: Vec<String> = raw
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    raw.set_column_names(trimmed.iter().map(|s| s.as_str()))?;

    let date_column = resolve_column(trimmed.iter().map(|s| s.as_str()), &schema.date)?;
    let jurisdiction_column =
        resolve_column(trimmed.iter().map(|s| s.as_str()), &schema.jurisdiction)?;

    // --- Step 2: dates ---
    let dates = parse_dates(raw.column(&date_column)?, &date_column)?;

    // --- Step 3: numeric columns, nulls replaced by zero ---
    let mut numeric: Vec<Series> = Vec::new();
    for name in &trimmed {
        if *name == date_column || *name == jurisdiction_column {
            continue;
        }
        match zero_filled(raw.column(name)?)? {
            Some(series) => numeric.push(series),
            None => log::warn!("Column '{name}' is not numeric and is left out of the analysis."),
        }
    }

    let mut frame = DataFrame::new(
        std::iter::once(raw.column(&jurisdiction_column)?.clone())
            .chain(numeric.into_iter().map(Column::from))
            .collect(),
    )?;

    // --- Step 4: jurisdiction filter ---
    let mut dates = dates;
    if let Some(wanted) = jurisdiction {
        let mask = frame
            .column(&jurisdiction_column)?
            .as_materialized_series()
            .cast(&DataType::String)?
            .str()?
            .equal(wanted);
        let keep: Vec<bool> = (&mask).into_iter().map(|m| m.unwrap_or(false)).collect();
        frame = frame.filter(&mask)?;
        dates = dates
            .into_iter()
            .zip(keep)
            .filter_map(|(date, keep)| keep.then_some(date))
            .collect();
        if dates.is_empty() {
            return Err(CleanError::NoRowsForJurisdiction(wanted.to_string()));
        }
        log::info!("Kept {} rows for jurisdiction '{wanted}'.", dates.len());
    }

    let jurisdictions = text_values(frame.column(&jurisdiction_column)?)?;
    let mut measures = Vec::with_capacity(frame.width().saturating_sub(1));
    for column in frame.get_columns() {
        if column.name().as_str() == jurisdiction_column {
            continue;
        }
        let values: Vec<f64> = column.f64()?.into_no_null_iter().collect();
        measures.push(Measure::new(column.name().to_string(), values));
    }
    let table = MortalityTable::new(dates, jurisdictions, measures)?;

    // --- Step 5: chronological order ---
    let mut order: Vec<usize> = (0..table.height()).collect();
    order.sort_by_key(|&i| table.dates[i]);
    let sorted = table.take(&order);
    log::debug!(
        "Cleaned table: {} rows, measures {:?}",
        sorted.height(),
        sorted.measure_names()
    );
    Ok(sorted)
}

/// Parses one date cell. Text is tried against the known layouts; numbers are
/// spreadsheet serial days.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn parse_dates(column: &Column, name: &str) -> Result<Vec<NaiveDate>, CleanError> {
    let series = column.as_materialized_series();
    if series.dtype() == &DataType::String {
        series
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                let text = cell.ok_or_else(|| CleanError::MissingDate {
                    column: name.to_string(),
                    row: row + 1,
                })?;
                parse_date(text).ok_or_else(|| CleanError::UnparsableDate {
                    column: name.to_string(),
                    row: row + 1,
                    value: text.to_string(),
                })
            })
            .collect()
    } else {
        let serials = series.cast(&DataType::Float64)?;
        serials
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                let serial = cell.ok_or_else(|| CleanError::MissingDate {
                    column: name.to_string(),
                    row: row + 1,
                })?;
                excel_serial_to_date(serial).ok_or_else(|| CleanError::UnparsableDate {
                    column: name.to_string(),
                    row: row + 1,
                    value: serial.to_string(),
                })
            })
            .collect()
    }
}

/// Casts a column to `Float64` and fills nulls with zero. Returns `None` only
/// for text columns, where casting turns present values into nulls. A column
/// with no values at all is kept as zeros.
fn zero_filled(column: &Column) -> Result<Option<Series>, CleanError> {
    let series = column.as_materialized_series();
    let casted = match series.cast(&DataType::Float64) {
        Ok(casted) => casted,
        Err(_) => return Ok(None),
    };
    if casted.null_count() > series.null_count() {
        return Ok(None);
    }
    Ok(Some(casted.fill_null(FillNullStrategy::Zero)?))
}

fn text_values(column: &Column) -> Result<Vec<String>, CleanError> {
    let series = column.as_materialized_series().cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}
