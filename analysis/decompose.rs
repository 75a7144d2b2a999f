//! # Additive Seasonal Decomposition
//!
//! Splits a series into `observed = trend + seasonal + residual`.
//!
//! - Trend: centred moving average over one period. For an even period the
//!   window is `period + 1` points with half weight at both ends (a 2×m
//!   moving average), so the first and last `period / 2` points have no trend.
//! - Seasonal: the mean of the detrended series at each position in the
//!   cycle, shifted so the indices sum to zero, then tiled over the series.
//! - Residual: what remains wherever the trend is defined.

use thiserror::Error;

/// Weekly data repeats yearly.
pub const WEEKLY_PERIOD: usize = 52;

#[derive(Error, Debug)]
pub enum DecomposeError {
    #[error(
        "Seasonal decomposition with period {period} needs two complete cycles ({required} observations), but only {found} are available."
    )]
    InsufficientObservations {
        period: usize,
        required: usize,
        found: usize,
    },
    #[error("The seasonal period must be at least 2, but was {0}.")]
    InvalidPeriod(usize),
}

#[derive(Debug, Clone)]
pub struct Decomposition {
    pub period: usize,
    pub observed: Vec<f64>,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
}

pub fn seasonal_decompose(series: &[f64], period: usize) -> Result<Decomposition, DecomposeError> {
    if period < 2 {
        return Err(DecomposeError::InvalidPeriod(period));
    }
    let n = series.len();
    if n < 2 * period {
        return Err(DecomposeError::InsufficientObservations {
            period,
            required: 2 * period,
            found: n,
        });
    }

    let trend = centered_moving_average(series, period);

    let mut position_sums = vec![0.0; period];
    let mut position_counts = vec![0usize; period];
    for (i, (value, t)) in series.iter().zip(&trend).enumerate() {
        if let Some(t) = t {
            position_sums[i % period] += value - t;
            position_counts[i % period] += 1;
        }
    }
    let mut indices: Vec<f64> = position_sums
        .iter()
        .zip(&position_counts)
        .map(|(sum, &count)| if count > 0 { sum / count as f64 } else { 0.0 })
        .collect();
    let index_mean = indices.iter().sum::<f64>() / period as f64;
    for index in &mut indices {
        *index -= index_mean;
    }

    let seasonal: Vec<f64> = (0..n).map(|i| indices[i % period]).collect();
    let residual = series
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((value, t), s)| t.map(|t| value - t - s))
        .collect();

    log::debug!("Decomposed {n} observations with period {period}");

    Ok(Decomposition {
        period,
        observed: series.to_vec(),
        trend,
        seasonal,
        residual,
    })
}

fn centered_moving_average(series: &[f64], period: usize) -> Vec<Option<f64>> {
    let weights: Vec<f64> = if period % 2 == 0 {
        let mut w = vec![1.0 / period as f64; period + 1];
        w[0] = 0.5 / period as f64;
        w[period] = 0.5 / period as f64;
        w
    } else {
        vec![1.0 / period as f64; period]
    };
    let half = weights.len() / 2;
    let n = series.len();

    (0..n)
        .map(|i| {
            if i < half || i + half >= n {
                return None;
            }
            let window = &series[i - half..=i + half];
            Some(window.iter().zip(&weights).map(|(v, w)| v * w).sum())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn seasonal_pattern(period: usize) -> Vec<f64> {
        let raw: Vec<f64> = (0..period).map(|i| ((i * 7) % 5) as f64 - 1.0).collect();
        let m = raw.iter().sum::<f64>() / period as f64;
        raw.into_iter().map(|v| v - m).collect()
    }

    #[test]
    fn recovers_linear_trend_plus_seasonal_pattern() {
        let period = 4;
        let pattern = seasonal_pattern(period);
        let series: Vec<f64> = (0..16)
            .map(|i| 100.0 + 2.0 * i as f64 + pattern[i % period])
            .collect();

        let result = seasonal_decompose(&series, period).unwrap();

        assert!(result.trend[0].is_none());
        assert!(result.trend[1].is_none());
        assert!(result.trend[14].is_none());
        assert!(result.trend[15].is_none());
        for i in 2..14 {
            assert_abs_diff_eq!(result.trend[i].unwrap(), 100.0 + 2.0 * i as f64, epsilon = 1e-9);
            assert_abs_diff_eq!(result.residual[i].unwrap(), 0.0, epsilon = 1e-9);
        }
        for i in 0..16 {
            assert_abs_diff_eq!(result.seasonal[i], pattern[i % period], epsilon = 1e-9);
        }
        assert_abs_diff_eq!(result.seasonal[..period].iter().sum::<f64>(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn odd_period_uses_plain_window() {
        let series: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let trend = centered_moving_average(&series, 3);
        assert_eq!(trend[0], None);
        assert_abs_diff_eq!(trend[1].unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(trend[7].unwrap(), 7.0, epsilon = 1e-12);
        assert_eq!(trend[8], None);
    }

    #[test]
    fn weekly_period_needs_two_years() {
        let series = vec![1.0; 103];
        match seasonal_decompose(&series, WEEKLY_PERIOD) {
            Err(DecomposeError::InsufficientObservations {
                required, found, ..
            }) => {
                assert_eq!(required, 104);
                assert_eq!(found, 103);
            }
            other => panic!("Expected InsufficientObservations, got {other:?}"),
        }
        assert!(seasonal_decompose(&vec![1.0; 104], WEEKLY_PERIOD).is_ok());
    }
}
