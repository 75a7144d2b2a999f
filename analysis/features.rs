//! # Feature Builder
//!
//! Derives calendar fields, one-step lags and 4-period rolling means of the
//! all-cause and COVID-19 series. Lags and rolling means are defined over row
//! order, not date arithmetic, so the input must be the cleaned, sorted table
//! of a single series. Rows whose derived values are undefined are dropped.

use crate::schema::{SchemaConfig, SchemaError, resolve_column};
use crate::table::{MortalityTable, TableError};
use chrono::Datelike;
use thiserror::Error;

/// Width of the rolling-mean window.
pub const ROLLING_WINDOW: usize = 4;
/// Rows at the head of the table whose rolling mean (and lag) is undefined.
pub const WARMUP_ROWS: usize = ROLLING_WINDOW - 1;

pub const ALL_CAUSE_LAG1: &str = "AllCause_Lag1";
pub const COVID_LAG1: &str = "COVID_Lag1";
pub const ALL_CAUSE_MA4: &str = "AllCause_MA4";
pub const COVID_MA4: &str = "COVID_MA4";

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(
        "The cleaned table has only {found} rows, but at least {required} are needed for the {window}-week rolling window."
    )]
    InsufficientRows {
        found: usize,
        required: usize,
        window: usize,
    },
}

/// The cleaned table restricted to rows with complete features, plus the
/// derived columns. Every vector has the table's height.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub table: MortalityTable,
    /// Resolved name of the all-cause column.
    pub all_cause: String,
    /// Resolved name of the COVID-19 column.
    pub covid: String,
    pub year: Vec<i32>,
    /// ISO calendar week.
    pub week: Vec<u32>,
    pub all_cause_lag1: Vec<f64>,
    pub covid_lag1: Vec<f64>,
    pub all_cause_ma4: Vec<f64>,
    pub covid_ma4: Vec<f64>,
}

impl FeatureTable {
    pub fn height(&self) -> usize {
        self.table.height()
    }

    pub fn all_cause_values(&self) -> &[f64] {
        self.values_of(&self.all_cause)
    }

    pub fn covid_values(&self) -> &[f64] {
        self.values_of(&self.covid)
    }

    fn values_of(&self, name: &str) -> &[f64] {
        // Both names were resolved against this table at construction.
        self.table
            .measures
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.values.as_slice())
            .unwrap_or(&[])
    }

    /// The predictor columns of the forecasting model, in model order.
    pub fn predictors(&self) -> [(&'static str, &[f64]); 4] {
        [
            (ALL_CAUSE_LAG1, self.all_cause_lag1.as_slice()),
            (COVID_LAG1, self.covid_lag1.as_slice()),
            (ALL_CAUSE_MA4, self.all_cause_ma4.as_slice()),
            (COVID_MA4, self.covid_ma4.as_slice()),
        ]
    }

    /// Every numeric column: the measures, then the derived columns.
    pub fn numeric_columns(&self) -> Vec<(String, Vec<f64>)> {
        let mut columns: Vec<(String, Vec<f64>)> = self
            .table
            .measures
            .iter()
            .map(|m| (m.name.clone(), m.values.clone()))
            .collect();
        columns.push(("year".to_string(), self.year.iter().map(|&y| y as f64).collect()));
        columns.push(("week".to_string(), self.week.iter().map(|&w| w as f64).collect()));
        for (name, values) in self.predictors() {
            columns.push((name.to_string(), values.to_vec()));
        }
        columns
    }
}

/// Value of the previous row; `None` for the first row.
pub fn lag1(values: &[f64]) -> Vec<Option<f64>> {
    std::iter::once(None)
        .chain(values.iter().map(|&v| Some(v)))
        .take(values.len())
        .collect()
}

/// Mean of the current row and the `window - 1` rows before it; `None` until
/// the window is full.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Builds the feature table from the cleaned, sorted table.
pub fn build_features(
    table: &MortalityTable,
    schema: &SchemaConfig,
) -> Result<FeatureTable, FeatureError> {
    if table.height() < ROLLING_WINDOW {
        return Err(FeatureError::InsufficientRows {
            found: table.height(),
            required: ROLLING_WINDOW,
            window: ROLLING_WINDOW,
        });
    }

    let names = table.measure_names();
    let all_cause = resolve_column(names.iter().copied(), &schema.all_cause)?;
    let covid = resolve_column(names.iter().copied(), &schema.covid)?;

    let all_values = &table.measure(&all_cause)?.values;
    let covid_values = &table.measure(&covid)?.values;

    let derived = [
        lag1(all_values),
        lag1(covid_values),
        rolling_mean(all_values, ROLLING_WINDOW),
        rolling_mean(covid_values, ROLLING_WINDOW),
    ];

    // A row is kept only when every derived value is defined.
    let first_complete = (0..table.height())
        .find(|&i| derived.iter().all(|column| column[i].is_some()))
        .unwrap_or(table.height());
    debug_assert_eq!(first_complete, WARMUP_ROWS);

    let [all_lag, covid_lag, all_ma, covid_ma] =
        derived.map(|column| column.into_iter().skip(first_complete).flatten().collect::<Vec<f64>>());

    let retained = table.skip_rows(first_complete);
    let year = retained.dates.iter().map(|d| d.year()).collect();
    let week = retained.dates.iter().map(|d| d.iso_week().week()).collect();

    log::info!(
        "Built features over {} rows ({} warm-up rows dropped).",
        retained.height(),
        first_complete
    );

    Ok(FeatureTable {
        table: retained,
        all_cause,
        covid,
        year,
        week,
        all_cause_lag1: all_lag,
        covid_lag1: covid_lag,
        all_cause_ma4: all_ma,
        covid_ma4: covid_ma,
    })
}
