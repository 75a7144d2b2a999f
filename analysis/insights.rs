//! Scalar summaries of the featured series: peak weeks, the COVID-19 /
//! all-cause correlation and yearly all-cause totals.

use crate::features::FeatureTable;
use crate::stats::pearson;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Insights {
    pub peak_covid_week: Option<NaiveDate>,
    pub peak_all_cause_week: Option<NaiveDate>,
    pub covid_all_cause_correlation: f64,
    pub yearly_totals: BTreeMap<i32, f64>,
}

/// Index of the largest value; the first one wins on ties.
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

pub fn yearly_totals(years: &[i32], values: &[f64]) -> BTreeMap<i32, f64> {
    let mut totals = BTreeMap::new();
    for (&year, &value) in years.iter().zip(values) {
        *totals.entry(year).or_insert(0.0) += value;
    }
    totals
}

pub fn extract_insights(features: &FeatureTable) -> Insights {
    let dates = &features.table.dates;
    let covid = features.covid_values();
    let all_cause = features.all_cause_values();

    Insights {
        peak_covid_week: first_argmax(covid).map(|i| dates[i]),
        peak_all_cause_week: first_argmax(all_cause).map(|i| dates[i]),
        covid_all_cause_correlation: pearson(covid, all_cause),
        yearly_totals: yearly_totals(&features.year, all_cause),
    }
}

impl fmt::Display for Insights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "n/a".into());
        writeln!(f, "----- INSIGHTS -----")?;
        writeln!(
            f,
            "Highest COVID-19 deaths recorded during week: {}",
            show(self.peak_covid_week)
        )?;
        writeln!(
            f,
            "Highest overall mortality recorded on: {}",
            show(self.peak_all_cause_week)
        )?;
        writeln!(
            f,
            "Correlation between COVID-19 & All-Cause Mortality: {:.2}",
            self.covid_all_cause_correlation
        )?;
        writeln!(f)?;
        writeln!(f, "Yearly Mortality Totals:")?;
        for (year, total) in &self.yearly_totals {
            writeln!(f, "{year}  {total:.0}")?;
        }
        Ok(())
    }
}
