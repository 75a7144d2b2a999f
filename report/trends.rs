//! Date-indexed line and area charts.

use super::canvas::{
    DrawResult, LABEL_FONT, TITLE_FONT, WIDE, date_label, date_span, day_offset, value_range,
};
use crate::forecast::ForecastReport;
use chrono::NaiveDate;
use plotters::prelude::*;
use std::path::Path;

/// One named line over the shared date axis.
struct Line<'a> {
    name: &'a str,
    values: &'a [f64],
    color: RGBColor,
    width: u32,
}

fn draw_lines(path: &Path, title: &str, dates: &[NaiveDate], lines: &[Line]) -> DrawResult {
    let root = SVGBackend::new(path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let (origin, span) = date_span(dates);
    let (lo, hi) = value_range(lines.iter().flat_map(|l| l.values.iter().copied()));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, TITLE_FONT)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(0f64..span, lo..hi)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|x| date_label(origin, *x))
        .x_desc("Week ending")
        .y_desc("Deaths")
        .label_style(LABEL_FONT)
        .draw()?;

    for line in lines {
        let color = line.color;
        chart
            .draw_series(LineSeries::new(
                dates
                    .iter()
                    .zip(line.values)
                    .map(|(d, v)| (day_offset(origin, *d), *v)),
                color.stroke_width(line.width),
            ))?
            .label(line.name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(LABEL_FONT)
        .draw()?;

    root.present()?;
    Ok(())
}

/// All-cause against natural-cause deaths.
pub fn draw_mortality_trends(
    path: &Path,
    dates: &[NaiveDate],
    all_cause: (&str, &[f64]),
    natural_cause: (&str, &[f64]),
) -> DrawResult {
    draw_lines(
        path,
        "Weekly Mortality Trends",
        dates,
        &[
            Line {
                name: all_cause.0,
                values: all_cause.1,
                color: BLUE,
                width: 2,
            },
            Line {
                name: natural_cause.0,
                values: natural_cause.1,
                color: RGBColor(255, 127, 14),
                width: 2,
            },
        ],
    )
}

/// Weekly COVID-19 deaths with their 4-week rolling mean.
pub fn draw_covid_trend(
    path: &Path,
    dates: &[NaiveDate],
    covid: &[f64],
    rolling: &[f64],
) -> DrawResult {
    draw_lines(
        path,
        "COVID-19 Deaths per Week",
        dates,
        &[
            Line {
                name: "Weekly",
                values: covid,
                color: RGBColor(148, 103, 189),
                width: 1,
            },
            Line {
                name: "4-week rolling mean",
                values: rolling,
                color: RED,
                width: 3,
            },
        ],
    )
}

/// Actual against predicted all-cause deaths over the held-out weeks.
pub fn draw_forecast(path: &Path, report: &ForecastReport) -> DrawResult {
    draw_lines(
        path,
        "All-Cause Forecast on Held-Out Weeks",
        &report.test_dates,
        &[
            Line {
                name: "Actual",
                values: &report.actual,
                color: BLACK,
                width: 2,
            },
            Line {
                name: "Predicted",
                values: &report.predicted,
                color: RGBColor(44, 160, 44),
                width: 2,
            },
        ],
    )
}

/// Running sums of each layer, bottom layer first.
fn cumulative_layers(layers: &[(String, &[f64])], rows: usize) -> Vec<Vec<f64>> {
    let mut running = vec![0.0; rows];
    layers
        .iter()
        .map(|(_, values)| {
            for (acc, v) in running.iter_mut().zip(values.iter()) {
                *acc += v;
            }
            running.clone()
        })
        .collect()
}

/// Stacked-area chart of cause layers. Bands are painted from the top
/// cumulative sum down so each lower band covers the one above it.
pub fn draw_stacked_causes(
    path: &Path,
    dates: &[NaiveDate],
    layers: &[(String, &[f64])],
) -> DrawResult {
    let root = SVGBackend::new(path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let stacks = cumulative_layers(layers, dates.len());
    let top = stacks
        .last()
        .map(|s| s.iter().copied().fold(0.0, f64::max))
        .unwrap_or(0.0);
    let (origin, span) = date_span(dates);

    let mut chart = ChartBuilder::on(&root)
        .caption("Selected Causes of Death (stacked)", TITLE_FONT)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(0f64..span, 0f64..(top * 1.05).max(1.0))?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|x| date_label(origin, *x))
        .x_desc("Week ending")
        .y_desc("Deaths")
        .label_style(LABEL_FONT)
        .draw()?;

    for (index, (name, _)) in layers.iter().enumerate().rev() {
        let color = Palette99::pick(index).to_rgba();
        chart
            .draw_series(AreaSeries::new(
                dates
                    .iter()
                    .zip(&stacks[index])
                    .map(|(d, v)| (day_offset(origin, *d), *v)),
                0.0,
                color.mix(0.85).filled(),
            ))?
            .label(name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(LABEL_FONT)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{LinearModel, Split};
    use approx::assert_abs_diff_eq;
    use chrono::Days;
    use ndarray::array;
    use tempfile::TempDir;

    fn weeks(n: u64) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 4).unwrap();
        (0..n)
            .map(|i| start.checked_add_days(Days::new(7 * i)).unwrap())
            .collect()
    }

    #[test]
    fn layers_accumulate_bottom_up() {
        let covid = [1.0, 2.0, 3.0];
        let heart = [10.0, 10.0, 10.0];
        let layers = vec![("COVID-19".to_string(), &covid[..]), ("Heart".to_string(), &heart[..])];
        let stacks = cumulative_layers(&layers, 3);
        assert_eq!(stacks.len(), 2);
        assert_abs_diff_eq!(stacks[0][2], 3.0);
        assert_abs_diff_eq!(stacks[1][0], 11.0);
        assert_abs_diff_eq!(stacks[1][2], 13.0);
    }

    #[test]
    fn line_and_area_charts_write_svg() {
        let dir = TempDir::new().unwrap();
        let dates = weeks(12);
        let all: Vec<f64> = (0..12).map(|i| 1000.0 + i as f64 * 5.0).collect();
        let natural: Vec<f64> = all.iter().map(|v| v * 0.9).collect();

        let trends = dir.path().join("trends.svg");
        draw_mortality_trends(&trends, &dates, ("All Cause", &all), ("Natural Cause", &natural))
            .unwrap();
        let svg = std::fs::read_to_string(&trends).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Natural Cause"));

        let layers = vec![("COVID-19".to_string(), &natural[..])];
        let stacked = dir.path().join("stacked.svg");
        draw_stacked_causes(&stacked, &dates, &layers).unwrap();
        assert!(stacked.exists());

        let report = ForecastReport {
            model: LinearModel {
                intercept: 0.0,
                coefficients: array![1.0, 0.0, 0.0, 0.0],
            },
            predictor_names: vec!["a", "b", "c", "d"],
            split: Split {
                train_rows: 10,
                test_rows: 2,
            },
            test_dates: dates[10..].to_vec(),
            actual: vec![1.0, 2.0],
            predicted: vec![1.5, 2.5],
            mae: 0.5,
            r2: 0.0,
        };
        let forecast = dir.path().join("forecast.svg");
        draw_forecast(&forecast, &report).unwrap();
        assert!(forecast.exists());
    }
}
