//! # Column Schema
//!
//! Names of the columns the pipeline depends on. The defaults follow the public
//! CDC "Weekly Counts of Deaths by Jurisdiction and Select Causes of Death"
//! export. Exports of the same data disagree on whether cause names carry a
//! disease-code suffix (`COVID-19` vs `COVID-19 (U071, Underlying Cause of Death)`),
//! so every lookup goes through [`resolve_column`], which accepts both.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("IO error while reading the schema file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("The schema file is not valid TOML: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
}

/// The canonical column names used throughout the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub date: String,
    pub jurisdiction: String,
    pub all_cause: String,
    pub natural_cause: String,
    pub covid: String,
    /// Causes drawn in the stacked-area chart.
    pub stacked_causes: Vec<String>,
    /// Numeric columns that are totals or calendar fields rather than causes.
    pub non_causes: Vec<String>,
    /// Jurisdiction the time series is restricted to. TOML cannot express
    /// `None`, so an empty string in a schema file also keeps every row.
    pub jurisdiction_filter: Option<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            date: "Week Ending Date".to_string(),
            jurisdiction: "Jurisdiction of Occurrence".to_string(),
            all_cause: "All Cause".to_string(),
            natural_cause: "Natural Cause".to_string(),
            covid: "COVID-19".to_string(),
            stacked_causes: vec![
                "COVID-19".to_string(),
                "Diseases of heart".to_string(),
                "Malignant neoplasms".to_string(),
            ],
            non_causes: vec![
                "All Cause".to_string(),
                "Natural Cause".to_string(),
                "MMWR Year".to_string(),
                "MMWR Week".to_string(),
            ],
            jurisdiction_filter: Some("United States".to_string()),
        }
    }
}

impl SchemaConfig {
    /// Reads a schema from a TOML file. Missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, SchemaError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The jurisdiction to filter on, if any. Blank names disable the filter.
    pub fn active_jurisdiction(&self) -> Option<&str> {
        self.jurisdiction_filter
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// True when `column` (an actual column name) is one of the configured
    /// non-cause columns, in either its plain or code-qualified form.
    pub fn is_non_cause(&self, column: &str) -> bool {
        self.non_causes
            .iter()
            .any(|canonical| matches_canonical(column, canonical))
    }
}

fn matches_canonical(column: &str, canonical: &str) -> bool {
    column == canonical
        || column
            .strip_prefix(canonical)
            .is_some_and(|rest| rest.starts_with(" ("))
}

/// Resolves a canonical column name against the names present in a table.
///
/// An exact match wins. Otherwise a code-qualified variant `"<canonical> (..."`
/// is accepted, preferring the one that mentions the underlying cause.
pub fn resolve_column<'a, I>(columns: I, canonical: &str) -> Result<String, SchemaError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut qualified: Vec<&str> = Vec::new();
    for column in columns {
        if column == canonical {
            return Ok(column.to_string());
        }
        if matches_canonical(column, canonical) {
            qualified.push(column);
        }
    }

    qualified
        .iter()
        .find(|c| c.contains("Underlying"))
        .or_else(|| qualified.first())
        .map(|c| c.to_string())
        .ok_or_else(|| SchemaError::ColumnNotFound(canonical.to_string()))
}
