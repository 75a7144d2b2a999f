// ========================================================================================
//
//                     Weekly mortality: exploration and baseline forecast
//
// ========================================================================================
//
// Drives the pipeline stage by stage: load, clean, derive features, summarise,
// decompose, forecast, extract insights and render the charts. Every stage
// failure is fatal and is reported with the name of the stage that raised it.

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::Parser;
use mortality::clean::clean;
use mortality::decompose::{WEEKLY_PERIOD, seasonal_decompose};
use mortality::features::build_features;
use mortality::forecast::run_forecast;
use mortality::insights::extract_insights;
use mortality::load::load_table;
use mortality::report::{ReportInputs, render_report};
use mortality::schema::SchemaConfig;
use mortality::stats::describe;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

// ========================================================================================
//                              Command-line interface definition
// ========================================================================================

#[derive(Parser, Debug)]
#[clap(
    name = "mortality",
    version,
    about = "Exploratory analysis and a baseline linear forecast of weekly death counts."
)]
struct Args {
    /// Spreadsheet (.xlsx, .xls, .ods) or delimited text file with one row per
    /// jurisdiction and week.
    #[clap(value_name = "INPUT", default_value = "python dataset.xlsx")]
    input: PathBuf,

    /// Jurisdiction to analyse. Overrides the schema's `jurisdiction_filter`.
    #[clap(long, conflicts_with = "all_jurisdictions")]
    jurisdiction: Option<String>,

    /// Keep every jurisdiction instead of filtering to one.
    #[clap(long)]
    all_jurisdictions: bool,

    /// Directory the SVG charts are written to.
    #[clap(long, default_value = "charts")]
    output_dir: PathBuf,

    /// TOML file overriding the expected column names.
    #[clap(long)]
    schema: Option<PathBuf>,
}

/// A failure tagged with the stage that produced it.
#[derive(Debug)]
struct StageFailure {
    stage: &'static str,
    source: Box<dyn Error>,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fatal error during {}: {}", self.stage, self.source)
    }
}

trait During<T> {
    fn during(self, stage: &'static str) -> Result<T, StageFailure>;
}

impl<T, E: Into<Box<dyn Error>>> During<T> for Result<T, E> {
    fn during(self, stage: &'static str) -> Result<T, StageFailure> {
        self.map_err(|e| StageFailure {
            stage,
            source: e.into(),
        })
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(failure) = run(args) {
        eprintln!("{failure}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), StageFailure> {
    let start = Instant::now();

    // --- Phase 1: Configuration ---
    let schema = match &args.schema {
        Some(path) => SchemaConfig::from_toml_file(path).during("configuration")?,
        None => SchemaConfig::default(),
    };
    let jurisdiction = if args.all_jurisdictions {
        None
    } else {
        args.jurisdiction
            .clone()
            .or_else(|| schema.active_jurisdiction().map(str::to_string))
    };

    // --- Phase 2: Loading ---
    log::info!("Loading {}", args.input.display());
    let raw = load_table(&args.input).during("loading")?;
    println!("Dataset shape: ({}, {})", raw.height(), raw.width());
    println!("{}", raw.head(Some(5)));

    // --- Phase 3: Cleaning ---
    let all_rows = clean(raw.clone(), &schema, None).during("cleaning")?;
    let table = clean(raw, &schema, jurisdiction.as_deref()).during("cleaning")?;
    if jurisdiction.is_none() {
        log::warn!(
            "No jurisdiction filter: lags and rolling means run across {} mixed rows.",
            table.height()
        );
    }

    // --- Phase 4: Feature Engineering ---
    let features = build_features(&table, &schema).during("feature engineering")?;
    let summary = describe(&features.numeric_columns()).during("feature engineering")?;
    println!("{summary}");

    // --- Phase 5: Seasonal Decomposition ---
    let decomposition =
        seasonal_decompose(features.all_cause_values(), WEEKLY_PERIOD).during("decomposition")?;

    // --- Phase 6: Forecasting ---
    let forecast = run_forecast(&features).during("forecasting")?;
    println!("Model Performance:");
    println!("MAE: {:.2}", forecast.mae);
    println!("R2 Score: {:.4}", forecast.r2);
    println!("Intercept: {:.4}", forecast.model.intercept);
    for (name, coefficient) in forecast
        .predictor_names
        .iter()
        .zip(forecast.model.coefficients.iter())
    {
        println!("  {name:<15} {coefficient:>12.4}");
    }

    // --- Phase 7: Insights ---
    let insights = extract_insights(&features);
    println!();
    print!("{insights}");

    // --- Phase 8: Charts ---
    let inputs = ReportInputs {
        features: &features,
        all_rows: &all_rows,
        schema: &schema,
        forecast: &forecast,
        decomposition: &decomposition,
        insights: &insights,
        national: jurisdiction.as_deref(),
    };
    let written = render_report(&inputs, &args.output_dir).during("chart rendering")?;

    log::info!(
        "Finished in {:.2?}; {} charts in {}.",
        start.elapsed(),
        written.len(),
        args.output_dir.display()
    );
    Ok(())
}
