//! Ranked totals: the share-of-deaths pie and the bar charts.

use super::canvas::{DrawResult, LABEL_FONT, SQUARE, TITLE_FONT, WIDE, short_label};
use plotters::prelude::*;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::path::Path;

/// Slices below this share get no percentage label.
const MIN_LABELLED_SHARE: f64 = 0.03;

fn draw_empty(path: &Path, size: (u32, u32), message: &str) -> DrawResult {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    root.draw(&Text::new(
        message.to_string(),
        (size.0 as i32 / 3, size.1 as i32 / 2),
        ("sans-serif", 20).into_font().color(&BLACK),
    ))?;
    root.present()?;
    Ok(())
}

/// Outline of one wedge, starting at the centre and sweeping clockwise from
/// `start` to `end` (radians, zero at twelve o'clock).
fn wedge(center: (i32, i32), radius: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = (((end - start) / TAU) * 360.0).ceil().max(1.0) as usize;
    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for step in 0..=steps {
        let angle = start + (end - start) * step as f64 / steps as f64 - FRAC_PI_2;
        points.push((
            center.0 + (radius * angle.cos()).round() as i32,
            center.1 + (radius * angle.sin()).round() as i32,
        ));
    }
    points
}

pub fn draw_pie(path: &Path, title: &str, slices: &[(String, f64)]) -> DrawResult {
    let total: f64 = slices.iter().map(|(_, v)| v.max(0.0)).sum();
    if total <= 0.0 {
        return draw_empty(path, SQUARE, "No cause totals to display");
    }

    let root = SVGBackend::new(path, SQUARE).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, TITLE_FONT)?;
    let (pie_area, legend_area) = root.split_horizontally(620);

    let (width, height) = pie_area.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.42;

    let mut start = 0.0;
    for (index, (name, value)) in slices.iter().enumerate() {
        let share = value.max(0.0) / total;
        let end = start + share * TAU;
        let color = Palette99::pick(index);
        pie_area.draw(&Polygon::new(wedge(center, radius, start, end), color.filled()))?;

        if share >= MIN_LABELLED_SHARE {
            let mid = (start + end) / 2.0 - FRAC_PI_2;
            let at = (
                center.0 + (radius * 0.7 * mid.cos()).round() as i32 - 18,
                center.1 + (radius * 0.7 * mid.sin()).round() as i32 - 6,
            );
            pie_area.draw(&Text::new(
                format!("{:.1}%", share * 100.0),
                at,
                ("sans-serif", 13).into_font().color(&BLACK),
            ))?;
        }

        let row = 40 + index as i32 * 26;
        legend_area.draw(&Rectangle::new([(0, row), (16, row + 16)], color.filled()))?;
        legend_area.draw(&Text::new(
            short_label(name, 34),
            (24, row + 2),
            LABEL_FONT.into_font().color(&BLACK),
        ))?;
        start = end;
    }

    root.present()?;
    Ok(())
}

/// Horizontal bars, first entry at the top.
pub fn draw_horizontal_bars(path: &Path, title: &str, ranked: &[(String, f64)]) -> DrawResult {
    if ranked.is_empty() {
        return draw_empty(path, WIDE, "Nothing to rank");
    }

    let root = SVGBackend::new(path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = ranked.len();
    let max = ranked.iter().map(|(_, v)| *v).fold(0.0, f64::max).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, TITLE_FONT)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(260)
        .build_cartesian_2d(0f64..max * 1.15, (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|y| match y {
            SegmentValue::CenterOf(i) if *i < n => short_label(&ranked[n - 1 - *i].0, 36),
            _ => String::new(),
        })
        .x_desc("Total deaths")
        .label_style(LABEL_FONT)
        .draw()?;

    chart.draw_series(ranked.iter().enumerate().map(|(rank, (_, value))| {
        let y = n - 1 - rank;
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(y)),
                (*value, SegmentValue::Exact(y + 1)),
            ],
            Palette99::pick(rank).filled(),
        );
        bar.set_margin(4, 4, 0, 0);
        bar
    }))?;

    chart.draw_series(ranked.iter().enumerate().map(|(rank, (_, value))| {
        Text::new(
            format!(" {value:.0}"),
            (*value, SegmentValue::CenterOf(n - 1 - rank)),
            LABEL_FONT.into_font().color(&BLACK),
        )
    }))?;

    root.present()?;
    Ok(())
}

/// Vertical bars of all-cause totals per year.
pub fn draw_yearly_bars(path: &Path, totals: &[(String, f64)]) -> DrawResult {
    if totals.is_empty() {
        return draw_empty(path, WIDE, "No yearly totals to display");
    }

    let root = SVGBackend::new(path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = totals.len();
    let max = totals.iter().map(|(_, v)| *v).fold(0.0, f64::max).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption("All-Cause Deaths per Year", TITLE_FONT)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..max * 1.1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => totals.get(*i).map(|(year, _)| year.clone()).unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc("Year")
        .y_desc("Deaths")
        .label_style(LABEL_FONT)
        .draw()?;

    chart.draw_series(totals.iter().enumerate().map(|(i, (_, total))| {
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), *total),
            ],
            RGBColor(31, 119, 180).filled(),
        );
        bar.set_margin(0, 0, 10, 10);
        bar
    }))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn wedge_spans_the_requested_arc() {
        let quarter = wedge((100, 100), 50.0, 0.0, TAU / 4.0);
        assert_eq!(quarter[0], (100, 100));
        // Twelve o'clock to three o'clock.
        assert_eq!(quarter[1], (100, 50));
        assert_eq!(*quarter.last().unwrap(), (150, 100));
    }

    #[test]
    fn ranking_charts_write_svg() {
        let dir = TempDir::new().unwrap();
        let ranked = vec![
            ("Diseases of heart".to_string(), 700.0),
            ("Malignant neoplasms".to_string(), 600.0),
            ("COVID-19".to_string(), 350.0),
            ("Other".to_string(), 10.0),
        ];

        let pie = dir.path().join("pie.svg");
        draw_pie(&pie, "Share of Deaths by Cause", &ranked).unwrap();
        let svg = std::fs::read_to_string(&pie).unwrap();
        assert!(svg.contains("Diseases of heart"));
        assert!(svg.contains("42.2%"));

        let bars = dir.path().join("bars.svg");
        draw_horizontal_bars(&bars, "Top Causes of Death", &ranked).unwrap();
        assert!(bars.exists());

        let yearly = vec![("2020".to_string(), 3.0e6), ("2021".to_string(), 3.4e6)];
        let years = dir.path().join("years.svg");
        draw_yearly_bars(&years, &yearly).unwrap();
        assert!(std::fs::read_to_string(&years).unwrap().contains("2021"));
    }

    #[test]
    fn empty_inputs_render_a_placeholder() {
        let dir = TempDir::new().unwrap();
        let pie = dir.path().join("pie.svg");
        draw_pie(&pie, "Empty", &[]).unwrap();
        assert!(std::fs::read_to_string(&pie).unwrap().contains("No cause totals"));
    }
}
