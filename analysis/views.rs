//! Grouped and pivoted views of the mortality table used by the charts.
//! None of them feed back into the table.

use crate::schema::SchemaConfig;
use crate::table::{MortalityTable, TableError};
use ahash::AHashMap;
use chrono::NaiveDate;
use itertools::Itertools;
use natord::compare;
use std::cmp::Ordering;

/// Totals of every cause column (measures not listed as non-causes),
/// largest first.
pub fn cause_totals(table: &MortalityTable, schema: &SchemaConfig) -> Vec<(String, f64)> {
    table
        .measures
        .iter()
        .filter(|m| !schema.is_non_cause(&m.name))
        .map(|m| (m.name.clone(), m.total()))
        .sorted_by(|a, b| descending(a.1, b.1))
        .collect()
}

/// Keeps the first `keep` entries and folds the rest into one "Other" entry.
pub fn top_with_other(ranked: &[(String, f64)], keep: usize) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = ranked.iter().take(keep).cloned().collect();
    let rest: f64 = ranked.iter().skip(keep).map(|(_, v)| v).sum();
    if ranked.len() > keep && rest > 0.0 {
        out.push(("Other".to_string(), rest));
    }
    out
}

/// Rows outside `exclude`. When that leaves nothing, every row is used.
fn rows_excluding(table: &MortalityTable, exclude: Option<&str>) -> Vec<usize> {
    let kept: Vec<usize> = (0..table.height())
        .filter(|&i| Some(table.jurisdictions[i].as_str()) != exclude)
        .collect();
    if kept.is_empty() {
        (0..table.height()).collect()
    } else {
        kept
    }
}

/// Sum of `measure` per jurisdiction, largest first. Rows of `exclude` (the
/// national aggregate) are left out so the ranking is over its parts.
pub fn jurisdiction_totals(
    table: &MortalityTable,
    measure: &str,
    exclude: Option<&str>,
) -> Result<Vec<(String, f64)>, TableError> {
    let values = &table.measure(measure)?.values;
    let mut totals: AHashMap<&str, f64> = AHashMap::new();
    for i in rows_excluding(table, exclude) {
        *totals.entry(table.jurisdictions[i].as_str()).or_insert(0.0) += values[i];
    }
    Ok(totals
        .into_iter()
        .map(|(name, total)| (name.to_string(), total))
        .sorted_by(|a, b| descending(a.1, b.1).then_with(|| compare(&a.0, &b.0)))
        .collect())
}

/// A jurisdiction × week matrix of summed values.
#[derive(Debug, Clone)]
pub struct Pivot {
    /// Jurisdictions in natural order.
    pub rows: Vec<String>,
    /// Week-ending dates, ascending.
    pub columns: Vec<NaiveDate>,
    /// `cells[row][column]`; weeks without a record are zero.
    pub cells: Vec<Vec<f64>>,
}

impl Pivot {
    pub fn max_value(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }
}

pub fn jurisdiction_week_pivot(
    table: &MortalityTable,
    measure: &str,
    exclude: Option<&str>,
) -> Result<Pivot, TableError> {
    let values = &table.measure(measure)?.values;
    let rows_used = rows_excluding(table, exclude);

    let rows: Vec<String> = rows_used
        .iter()
        .map(|&i| table.jurisdictions[i].clone())
        .unique()
        .sorted_by(|a, b| compare(a, b))
        .collect();
    let columns: Vec<NaiveDate> = rows_used
        .iter()
        .map(|&i| table.dates[i])
        .unique()
        .sorted()
        .collect();

    let row_index: AHashMap<&str, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let column_index: AHashMap<NaiveDate, usize> =
        columns.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut cells = vec![vec![0.0; columns.len()]; rows.len()];
    for &i in &rows_used {
        let r = row_index[table.jurisdictions[i].as_str()];
        let c = column_index[&table.dates[i]];
        cells[r][c] += values[i];
    }

    Ok(Pivot {
        rows,
        columns,
        cells,
    })
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Measure;
    use approx::assert_abs_diff_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn multi_jurisdiction_table() -> MortalityTable {
        MortalityTable::new(
            vec![d(2), d(2), d(2), d(9), d(9), d(9), d(9)],
            vec![
                "United States".into(),
                "Texas".into(),
                "Region 10".into(),
                "United States".into(),
                "Texas".into(),
                "Region 2".into(),
                "Texas".into(),
            ],
            vec![
                Measure::new("All Cause", vec![100.0, 30.0, 5.0, 110.0, 35.0, 8.0, 1.0]),
                Measure::new("COVID-19", vec![10.0, 3.0, 1.0, 12.0, 4.0, 2.0, 1.0]),
                Measure::new("Diseases of heart", vec![20.0, 6.0, 1.0, 22.0, 7.0, 2.0, 0.0]),
                Measure::new("MMWR Week", vec![1.0; 7]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn cause_totals_skip_non_causes() {
        let totals = cause_totals(&multi_jurisdiction_table(), &SchemaConfig::default());
        let names: Vec<&str> = totals.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Diseases of heart", "COVID-19"]);
        assert_abs_diff_eq!(totals[0].1, 58.0);
        assert_abs_diff_eq!(totals[1].1, 33.0);
    }

    #[test]
    fn other_bucket_collects_the_tail() {
        let ranked = vec![
            ("a".to_string(), 5.0),
            ("b".to_string(), 3.0),
            ("c".to_string(), 2.0),
            ("d".to_string(), 1.0),
        ];
        let folded = top_with_other(&ranked, 2);
        assert_eq!(folded.len(), 3);
        assert_eq!(folded[2].0, "Other");
        assert_abs_diff_eq!(folded[2].1, 3.0);
        assert_eq!(top_with_other(&ranked, 10).len(), 4);
    }

    #[test]
    fn jurisdiction_totals_exclude_national_rows() {
        let totals =
            jurisdiction_totals(&multi_jurisdiction_table(), "All Cause", Some("United States"))
                .unwrap();
        assert_eq!(totals[0].0, "Texas");
        assert_abs_diff_eq!(totals[0].1, 66.0);
        assert!(totals.iter().all(|(name, _)| name != "United States"));
    }

    #[test]
    fn pivot_sums_duplicate_cells_and_orders_naturally() {
        let pivot =
            jurisdiction_week_pivot(&multi_jurisdiction_table(), "COVID-19", Some("United States"))
                .unwrap();
        assert_eq!(pivot.rows, vec!["Region 2", "Region 10", "Texas"]);
        assert_eq!(pivot.columns, vec![d(2), d(9)]);
        assert_abs_diff_eq!(pivot.cells[2][1], 5.0);
        assert_abs_diff_eq!(pivot.cells[0][0], 0.0);
        assert_abs_diff_eq!(pivot.max_value(), 5.0);
    }

    #[test]
    fn single_jurisdiction_tables_keep_their_rows() {
        let table = multi_jurisdiction_table().take(&[0, 3]);
        let pivot = jurisdiction_week_pivot(&table, "COVID-19", Some("United States")).unwrap();
        assert_eq!(pivot.rows, vec!["United States"]);
        assert_abs_diff_eq!(pivot.cells[0][1], 12.0);
    }
}
