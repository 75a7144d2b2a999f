//! Cell-grid charts: the numeric correlation matrix and the
//! jurisdiction-by-week pivot.

use super::canvas::{
    DrawResult, LABEL_FONT, SQUARE, TALL, TITLE_FONT, diverging_color, sequential_color,
    short_label,
};
use crate::views::Pivot;
use plotters::prelude::*;
use std::path::Path;

/// Matrices wider than this are drawn without per-cell annotations.
const ANNOTATED_LIMIT: usize = 16;

/// Pearson correlations of every numeric column pair, first column at the top.
pub fn draw_correlation_heatmap(
    path: &Path,
    names: &[String],
    matrix: &[Vec<f64>],
) -> DrawResult {
    let root = SVGBackend::new(path, SQUARE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = names.len().max(1);
    let labels: Vec<String> = names.iter().map(|name| short_label(name, 22)).collect();
    let label_at = |index: usize| labels.get(index).cloned().unwrap_or_default();

    let mut chart = ChartBuilder::on(&root)
        .caption("Correlation Heatmap", TITLE_FONT)
        .margin(20)
        .x_label_area_size(140)
        .y_label_area_size(170)
        .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => label_at(*i),
            _ => String::new(),
        })
        .y_label_formatter(&|y| match y {
            SegmentValue::CenterOf(i) if *i < n => label_at(n - 1 - *i),
            _ => String::new(),
        })
        .x_label_style(LABEL_FONT.into_font().transform(FontTransform::Rotate90))
        .y_label_style(LABEL_FONT)
        .draw()?;

    for (row, values) in matrix.iter().enumerate() {
        let y = n - 1 - row;
        chart.draw_series(values.iter().enumerate().map(|(col, r)| {
            Rectangle::new(
                [
                    (SegmentValue::Exact(col), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(col + 1), SegmentValue::Exact(y + 1)),
                ],
                diverging_color(*r).filled(),
            )
        }))?;
        if n <= ANNOTATED_LIMIT {
            chart.draw_series(values.iter().enumerate().map(|(col, r)| {
                Text::new(
                    format!("{r:.2}"),
                    (SegmentValue::CenterOf(col), SegmentValue::CenterOf(y)),
                    ("sans-serif", 11).into_font().color(&BLACK),
                )
            }))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Summed `measure` per jurisdiction and week, scaled against the largest cell.
pub fn draw_pivot_heatmap(path: &Path, pivot: &Pivot, measure: &str) -> DrawResult {
    let root = SVGBackend::new(path, TALL).into_drawing_area();
    root.fill(&WHITE)?;

    let rows = pivot.rows.len().max(1);
    let cols = pivot.columns.len().max(1);
    let scale = pivot.max_value();

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{measure} Deaths by Jurisdiction and Week"), TITLE_FONT)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(170)
        .build_cartesian_2d(0..cols, 0..rows)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(10)
        .y_labels(rows.min(60))
        .x_label_formatter(&|x| {
            pivot
                .columns
                .get(*x)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .y_label_formatter(&|y| {
            pivot
                .rows
                .get(rows - 1 - (*y).min(rows - 1))
                .map(|name| short_label(name, 24))
                .unwrap_or_default()
        })
        .x_desc("Week ending")
        .label_style(LABEL_FONT)
        .draw()?;

    for (row, cells) in pivot.cells.iter().enumerate() {
        let y = rows - 1 - row;
        chart.draw_series(cells.iter().enumerate().map(|(col, value)| {
            let shade = if scale > 0.0 { value / scale } else { 0.0 };
            Rectangle::new([(col, y), (col + 1, y + 1)], sequential_color(shade).filled())
        }))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn heatmaps_write_svg_files() {
        let dir = TempDir::new().unwrap();

        let names = vec!["All Cause".to_string(), "COVID-19".to_string(), "week".to_string()];
        let matrix = vec![
            vec![1.0, 0.8, f64::NAN],
            vec![0.8, 1.0, -0.3],
            vec![f64::NAN, -0.3, 1.0],
        ];
        let correlation = dir.path().join("corr.svg");
        draw_correlation_heatmap(&correlation, &names, &matrix).unwrap();
        let svg = std::fs::read_to_string(&correlation).unwrap();
        assert!(svg.contains("0.80"));

        let pivot = Pivot {
            rows: vec!["Alabama".into(), "Texas".into()],
            columns: vec![
                NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2021, 1, 9).unwrap(),
            ],
            cells: vec![vec![1.0, 0.0], vec![4.0, 2.0]],
        };
        let heatmap = dir.path().join("pivot.svg");
        draw_pivot_heatmap(&heatmap, &pivot, "COVID-19").unwrap();
        assert!(heatmap.exists());
    }

    #[test]
    fn empty_pivot_still_renders() {
        let dir = TempDir::new().unwrap();
        let pivot = Pivot {
            rows: Vec::new(),
            columns: Vec::new(),
            cells: Vec::new(),
        };
        let heatmap = dir.path().join("empty.svg");
        draw_pivot_heatmap(&heatmap, &pivot, "COVID-19").unwrap();
        assert!(heatmap.exists());
    }
}
