//! Shared drawing helpers: axis ranges, date labels and colour scales.

use chrono::{Days, NaiveDate};
use plotters::prelude::*;
use std::error::Error;

pub type DrawResult = Result<(), Box<dyn Error>>;

pub const WIDE: (u32, u32) = (1200, 600);
pub const SQUARE: (u32, u32) = (1000, 900);
pub const TALL: (u32, u32) = (1200, 1100);

pub const TITLE_FONT: (&str, u32) = ("sans-serif", 24);
pub const LABEL_FONT: (&str, u32) = ("sans-serif", 13);

/// Days from `origin` to `date`, as a plotting coordinate.
pub fn day_offset(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64
}

pub fn date_label(origin: NaiveDate, offset: f64) -> String {
    origin
        .checked_add_days(Days::new(offset.max(0.0).round() as u64))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// X range in days covering `dates`; never empty.
pub fn date_span(dates: &[NaiveDate]) -> (NaiveDate, f64) {
    let origin = dates.first().copied().unwrap_or_default();
    let last = dates.last().copied().unwrap_or(origin);
    (origin, day_offset(origin, last).max(1.0))
}

/// A padded `(min, max)` over finite values; `(0, 1)` when there are none.
pub fn value_range<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(hi.abs() * 0.01).max(1e-9);
    (lo - pad, hi + pad)
}

/// Shortens long disease-code-qualified names for axis labels.
pub fn short_label(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let head: String = name.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{head}…")
}

fn lerp(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> RGBColor {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Diverging blue-white-red scale for values in `[-1, 1]`. `NaN` is grey.
pub fn diverging_color(value: f64) -> RGBColor {
    const COLD: (u8, u8, u8) = (59, 76, 192);
    const NEUTRAL: (u8, u8, u8) = (221, 221, 221);
    const WARM: (u8, u8, u8) = (180, 4, 38);
    if !value.is_finite() {
        return RGBColor(160, 160, 160);
    }
    let v = value.clamp(-1.0, 1.0);
    if v < 0.0 {
        lerp(NEUTRAL, COLD, -v)
    } else {
        lerp(NEUTRAL, WARM, v)
    }
}

/// Sequential yellow-orange-red scale for values in `[0, 1]`.
pub fn sequential_color(value: f64) -> RGBColor {
    const LOW: (u8, u8, u8) = (255, 255, 204);
    const MID: (u8, u8, u8) = (253, 141, 60);
    const HIGH: (u8, u8, u8) = (189, 0, 38);
    let v = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    if v < 0.5 {
        lerp(LOW, MID, v * 2.0)
    } else {
        lerp(MID, HIGH, (v - 0.5) * 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colour_scales_hit_their_endpoints() {
        let cold = diverging_color(-1.0);
        let warm = diverging_color(1.0);
        let neutral = diverging_color(0.0);
        assert_eq!((cold.0, cold.1, cold.2), (59, 76, 192));
        assert_eq!((warm.0, warm.1, warm.2), (180, 4, 38));
        assert_eq!((neutral.0, neutral.1, neutral.2), (221, 221, 221));
        assert_eq!(diverging_color(f64::NAN).0, 160);

        let low = sequential_color(0.0);
        let high = sequential_color(1.0);
        assert_eq!((low.0, low.1, low.2), (255, 255, 204));
        assert_eq!((high.0, high.1, high.2), (189, 0, 38));
    }

    #[test]
    fn ranges_and_labels() {
        let (lo, hi) = value_range([2.0, 4.0, f64::NAN]);
        assert!(lo < 2.0 && hi > 4.0);
        assert_eq!(value_range(Vec::<f64>::new()), (0.0, 1.0));

        let origin = NaiveDate::from_ymd_opt(2020, 1, 4).unwrap();
        assert_eq!(date_label(origin, 7.0), "2020-01-11");
        assert_eq!(short_label("COVID-19", 12), "COVID-19");
        assert_eq!(short_label("Malignant neoplasms (C00-C97)", 10), "Malignant…");
    }
}
