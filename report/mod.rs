//! # Reporter
//!
//! Renders the chart set as SVG files into an output directory. Every chart
//! reads from the featured table, the unfiltered cleaned table, or a grouped
//! view of one of them; none of them changes its input.
//!
//! Data for every chart is gathered first, so column and schema problems are
//! reported as typed errors before any file is written. Drawing then runs
//! chart by chart behind a progress bar.

mod canvas;
mod decomposition;
mod heatmaps;
mod rankings;
mod trends;

use crate::decompose::Decomposition;
use crate::features::FeatureTable;
use crate::forecast::ForecastReport;
use crate::insights::Insights;
use crate::schema::{SchemaConfig, SchemaError, resolve_column};
use crate::stats::correlation_matrix;
use crate::table::{MortalityTable, TableError};
use crate::views::{cause_totals, jurisdiction_totals, jurisdiction_week_pivot, top_with_other};
use canvas::DrawResult;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Causes kept as separate slices in the share-of-deaths pie.
pub const PIE_SLICES: usize = 8;
/// Bars shown in the cause and jurisdiction rankings.
pub const RANKED_BARS: usize = 10;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Could not create the chart directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to render chart '{chart}': {message}")]
    Render { chart: String, message: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(
        "None of the stacked-area causes [{0}] exist in the table. Check 'stacked_causes' in the schema file."
    )]
    NoStackedCauses(String),
}

/// Everything the charts are drawn from.
pub struct ReportInputs<'a> {
    pub features: &'a FeatureTable,
    /// The cleaned table before the jurisdiction filter.
    pub all_rows: &'a MortalityTable,
    pub schema: &'a SchemaConfig,
    pub forecast: &'a ForecastReport,
    pub decomposition: &'a Decomposition,
    pub insights: &'a Insights,
    /// Jurisdiction left out of the cross-jurisdiction views.
    pub national: Option<&'a str>,
}

type ChartJob<'a> = (&'static str, Box<dyn Fn(&Path) -> DrawResult + 'a>);

fn job<'a>(chart: &'static str, draw: impl Fn(&Path) -> DrawResult + 'a) -> ChartJob<'a> {
    (chart, Box::new(draw))
}

fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let draw_target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(Some(len), draw_target);
    pb.set_style(
        ProgressStyle::with_template(
            "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb.set_message(message.to_string());
    pb
}

/// Renders every chart into `output_dir`, creating it if needed, and returns
/// the written paths in rendering order.
pub fn render_report(
    inputs: &ReportInputs,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ChartError> {
    std::fs::create_dir_all(output_dir).map_err(|source| ChartError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    // --- Gather chart data ---
    let features = inputs.features;
    let dates = &features.table.dates;
    let measure_names = features.table.measure_names();

    let natural_name = resolve_column(measure_names.iter().copied(), &inputs.schema.natural_cause)?;
    let natural = &features.table.measure(&natural_name)?.values;

    let numeric = features.numeric_columns();
    let correlations = correlation_matrix(&numeric);
    let numeric_names: Vec<String> = numeric.into_iter().map(|(name, _)| name).collect();

    let mut stacked: Vec<(String, &[f64])> = Vec::new();
    for cause in &inputs.schema.stacked_causes {
        match resolve_column(measure_names.iter().copied(), cause) {
            Ok(name) => {
                let values = features.table.measure(&name)?.values.as_slice();
                stacked.push((name, values));
            }
            Err(e) => log::warn!("Skipping stacked-area cause: {e}"),
        }
    }
    if stacked.is_empty() {
        return Err(ChartError::NoStackedCauses(
            inputs.schema.stacked_causes.join(", "),
        ));
    }

    let pivot = jurisdiction_week_pivot(inputs.all_rows, &features.covid, inputs.national)?;
    let ranked_causes = cause_totals(&features.table, inputs.schema);
    let pie_slices = top_with_other(&ranked_causes, PIE_SLICES);
    let top_causes: Vec<(String, f64)> =
        ranked_causes.iter().take(RANKED_BARS).cloned().collect();
    let top_jurisdictions: Vec<(String, f64)> =
        jurisdiction_totals(inputs.all_rows, &features.all_cause, inputs.national)?
            .into_iter()
            .take(RANKED_BARS)
            .collect();
    let yearly: Vec<(String, f64)> = inputs
        .insights
        .yearly_totals
        .iter()
        .map(|(year, total)| (year.to_string(), *total))
        .collect();

    log::debug!(
        "Chart data ready: {} numeric columns, {} stacked causes, pivot {}x{}.",
        numeric_names.len(),
        stacked.len(),
        pivot.rows.len(),
        pivot.columns.len()
    );

    // --- Draw ---
    let jobs: Vec<ChartJob> = vec![
        job("mortality_trends", |path| {
            trends::draw_mortality_trends(
                path,
                dates,
                (features.all_cause.as_str(), features.all_cause_values()),
                (natural_name.as_str(), natural.as_slice()),
            )
        }),
        job("covid_weekly", |path| {
            trends::draw_covid_trend(path, dates, features.covid_values(), &features.covid_ma4)
        }),
        job("correlation_heatmap", |path| {
            heatmaps::draw_correlation_heatmap(path, &numeric_names, &correlations)
        }),
        job("seasonal_decomposition", |path| {
            decomposition::draw_decomposition(path, dates, inputs.decomposition)
        }),
        job("stacked_causes", |path| {
            trends::draw_stacked_causes(path, dates, &stacked)
        }),
        job("jurisdiction_covid_heatmap", |path| {
            heatmaps::draw_pivot_heatmap(path, &pivot, &features.covid)
        }),
        job("cause_share_pie", |path| {
            rankings::draw_pie(path, "Share of Deaths by Cause", &pie_slices)
        }),
        job("top_causes", |path| {
            rankings::draw_horizontal_bars(path, "Top Causes of Death", &top_causes)
        }),
        job("top_jurisdictions", |path| {
            rankings::draw_horizontal_bars(path, "Jurisdictions by All-Cause Deaths", &top_jurisdictions)
        }),
        job("yearly_totals", |path| rankings::draw_yearly_bars(path, &yearly)),
        job("forecast", |path| trends::draw_forecast(path, inputs.forecast)),
    ];

    let pb = create_progress_bar(jobs.len() as u64, "Rendering charts...");
    let mut written = Vec::with_capacity(jobs.len());
    for (ordinal, (chart, draw)) in jobs.iter().enumerate() {
        let path = output_dir.join(format!("{:02}_{chart}.svg", ordinal + 1));
        pb.set_message(chart.to_string());
        draw(&path).map_err(|e| ChartError::Render {
            chart: chart.to_string(),
            message: e.to_string(),
        })?;
        log::debug!("Wrote {}", path.display());
        written.push(path);
        pb.inc(1);
    }
    pb.finish_with_message("Charts rendered.");

    log::info!("Rendered {} charts into {}.", written.len(), output_dir.display());
    Ok(written)
}
