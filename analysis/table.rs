//! # The Mortality Record Table
//!
//! A row-per-(week, jurisdiction) table. It is built once by the cleaner,
//! extended by the feature builder and discarded at exit. All columns share
//! the same length; this is checked at construction and never re-checked.

use chrono::NaiveDate;
use thiserror::Error;

/// One numeric column of the table, e.g. `All Cause` or `Diseases of heart`.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    pub name: String,
    pub values: Vec<f64>,
}

impl Measure {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error(
        "Column '{column}' has {found} rows, but the table has {expected}. All columns must have equal length."
    )]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("The required column '{0}' is not a numeric column of the table.")]
    MeasureNotFound(String),
}

/// The cleaned, typed table. Dates are in non-decreasing order once the
/// cleaner has sorted it.
#[derive(Debug, Clone, PartialEq)]
pub struct MortalityTable {
    pub dates: Vec<NaiveDate>,
    pub jurisdictions: Vec<String>,
    pub measures: Vec<Measure>,
}

impl MortalityTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        jurisdictions: Vec<String>,
        measures: Vec<Measure>,
    ) -> Result<Self, TableError> {
        let expected = dates.len();
        if jurisdictions.len() != expected {
            return Err(TableError::RaggedColumn {
                column: "jurisdiction".to_string(),
                expected,
                found: jurisdictions.len(),
            });
        }
        for measure in &measures {
            if measure.values.len() != expected {
                return Err(TableError::RaggedColumn {
                    column: measure.name.clone(),
                    expected,
                    found: measure.values.len(),
                });
            }
        }
        Ok(Self {
            dates,
            jurisdictions,
            measures,
        })
    }

    pub fn height(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn measure(&self, name: &str) -> Result<&Measure, TableError> {
        self.measures
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| TableError::MeasureNotFound(name.to_string()))
    }

    pub fn measure_names(&self) -> Vec<&str> {
        self.measures.iter().map(|m| m.name.as_str()).collect()
    }

    /// Builds a table holding the rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            dates: indices.iter().map(|&i| self.dates[i]).collect(),
            jurisdictions: indices
                .iter()
                .map(|&i| self.jurisdictions[i].clone())
                .collect(),
            measures: self
                .measures
                .iter()
                .map(|m| Measure::new(m.name.clone(), indices.iter().map(|&i| m.values[i]).collect()))
                .collect(),
        }
    }

    /// Drops the first `n` rows. Returns an empty table if `n` exceeds the height.
    pub fn skip_rows(&self, n: usize) -> Self {
        let indices: Vec<usize> = (n.min(self.height())..self.height()).collect();
        self.take(&indices)
    }
}
