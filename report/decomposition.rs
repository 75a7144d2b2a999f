//! Four-panel chart of the additive seasonal decomposition.

use super::canvas::{DrawResult, LABEL_FONT, TALL, date_label, date_span, day_offset, value_range};
use crate::decompose::Decomposition;
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

enum Marks {
    Line,
    Points,
}

fn draw_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    title: &str,
    dates: &[NaiveDate],
    values: &[Option<f64>],
    marks: Marks,
) -> DrawResult {
    let (origin, span) = date_span(dates);
    let (lo, hi) = value_range(values.iter().flatten().copied());
    let points: Vec<(f64, f64)> = dates
        .iter()
        .zip(values)
        .filter_map(|(d, v)| v.map(|v| (day_offset(origin, *d), v)))
        .collect();

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(80)
        .build_cartesian_2d(0f64..span, lo..hi)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .y_labels(5)
        .x_label_formatter(&|x| date_label(origin, *x))
        .label_style(LABEL_FONT)
        .draw()?;

    match marks {
        Marks::Line => {
            chart.draw_series(LineSeries::new(points, BLUE.stroke_width(2)))?;
        }
        Marks::Points => {
            chart.draw_series(
                points
                    .into_iter()
                    .map(|p| Circle::new(p, 2, BLUE.filled())),
            )?;
        }
    }
    Ok(())
}

/// Observed, trend, seasonal and residual panels stacked top to bottom.
pub fn draw_decomposition(
    path: &Path,
    dates: &[NaiveDate],
    decomposition: &Decomposition,
) -> DrawResult {
    let root = SVGBackend::new(path, TALL).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(
        &format!(
            "Seasonal Decomposition of All-Cause Deaths (period {})",
            decomposition.period
        ),
        ("sans-serif", 24),
    )?;

    let observed: Vec<Option<f64>> = decomposition.observed.iter().map(|v| Some(*v)).collect();
    let seasonal: Vec<Option<f64>> = decomposition.seasonal.iter().map(|v| Some(*v)).collect();

    let panels = root.split_evenly((4, 1));
    draw_panel(&panels[0], "Observed", dates, &observed, Marks::Line)?;
    draw_panel(&panels[1], "Trend", dates, &decomposition.trend, Marks::Line)?;
    draw_panel(&panels[2], "Seasonal", dates, &seasonal, Marks::Line)?;
    draw_panel(&panels[3], "Residual", dates, &decomposition.residual, Marks::Points)?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompose::{WEEKLY_PERIOD, seasonal_decompose};
    use chrono::Days;
    use tempfile::TempDir;

    #[test]
    fn four_panels_render() {
        let start = NaiveDate::from_ymd_opt(2019, 1, 5).unwrap();
        let n = 2 * WEEKLY_PERIOD + 6;
        let dates: Vec<NaiveDate> = (0..n as u64)
            .map(|i| start.checked_add_days(Days::new(7 * i)).unwrap())
            .collect();
        let series: Vec<f64> = (0..n)
            .map(|i| 500.0 + i as f64 + 30.0 * ((i % WEEKLY_PERIOD) as f64 / 8.0).sin())
            .collect();
        let decomposition = seasonal_decompose(&series, WEEKLY_PERIOD).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("decomposition.svg");
        draw_decomposition(&path, &dates, &decomposition).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Residual"));
        assert!(svg.contains("period 52"));
    }
}
