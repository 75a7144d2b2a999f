//! # Baseline Forecaster
//!
//! Ordinary least squares of the current all-cause count on the lag and
//! rolling-mean features. The table is split chronologically: the first
//! `floor(0.8 * n)` rows train the model and the remainder score it, so no
//! future observation leaks into the fit. There is no regularisation and no
//! cross-validation; this is a baseline.

use crate::features::FeatureTable;
use crate::stats::{mean_absolute_error, r2_score};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::LeastSquaresSvd;
use thiserror::Error;

/// Share of rows used for training.
pub const TRAIN_FRACTION: f64 = 0.8;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Least-squares solve failed: {0}")]
    LinalgError(#[from] ndarray_linalg::error::LinalgError),
    #[error(
        "The {segment} segment has {found} rows, but at least {required} are needed to fit and score {predictors} predictors."
    )]
    InsufficientRows {
        segment: &'static str,
        found: usize,
        required: usize,
        predictors: usize,
    },
    #[error("Design matrix has {rows} rows but the target has {targets}.")]
    DimensionMismatch { rows: usize, targets: usize },
}

/// A fitted linear model `y = intercept + x · coefficients`.
#[derive(Debug, Clone)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Array1<f64>,
}

impl LinearModel {
    /// Fits the model with an intercept. Columns and target are centred first;
    /// the centred problem is solved by SVD, which returns the minimum-norm
    /// solution when the design is rank deficient.
    pub fn fit(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Self, ForecastError> {
        if x.nrows() != y.len() {
            return Err(ForecastError::DimensionMismatch {
                rows: x.nrows(),
                targets: y.len(),
            });
        }
        let required = x.ncols() + 1;
        if x.nrows() < required {
            return Err(ForecastError::InsufficientRows {
                segment: "training",
                found: x.nrows(),
                required,
                predictors: x.ncols(),
            });
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let y_mean = y.mean().unwrap_or(0.0);
        let x_centered = &x - &x_mean;
        let y_centered = &y - y_mean;

        let solution = x_centered.least_squares(&y_centered)?;
        let coefficients = solution.solution;
        let intercept = y_mean - x_mean.dot(&coefficients);

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }
}

/// Row ranges of the chronological split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub train_rows: usize,
    pub test_rows: usize,
}

pub fn chronological_split(total: usize) -> Split {
    let train_rows = (total as f64 * TRAIN_FRACTION).floor() as usize;
    Split {
        train_rows,
        test_rows: total - train_rows,
    }
}

/// The scored forecast over the held-out segment.
#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub model: LinearModel,
    pub predictor_names: Vec<&'static str>,
    pub split: Split,
    pub test_dates: Vec<NaiveDate>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
    pub mae: f64,
    pub r2: f64,
}

/// Assembles the `[rows, predictors]` design matrix of the feature table.
pub fn design_matrix(features: &FeatureTable) -> Array2<f64> {
    let predictors = features.predictors();
    Array2::from_shape_fn((features.height(), predictors.len()), |(row, col)| {
        predictors[col].1[row]
    })
}

/// Splits, fits and scores the baseline model.
pub fn run_forecast(features: &FeatureTable) -> Result<ForecastReport, ForecastError> {
    let x = design_matrix(features);
    let y = Array1::from_vec(features.all_cause_values().to_vec());
    let split = chronological_split(features.height());

    if split.test_rows == 0 {
        return Err(ForecastError::InsufficientRows {
            segment: "test",
            found: 0,
            required: 1,
            predictors: x.ncols(),
        });
    }

    let (x_train, x_test) = x.view().split_at(Axis(0), split.train_rows);
    let (y_train, y_test) = y.view().split_at(Axis(0), split.train_rows);

    log::info!(
        "Fitting OLS on {} training rows; scoring on {} test rows.",
        split.train_rows,
        split.test_rows
    );
    let model = LinearModel::fit(x_train, y_train)?;
    let predicted = model.predict(x_test).to_vec();
    let actual = y_test.to_vec();

    let mae = mean_absolute_error(&actual, &predicted);
    let r2 = r2_score(&actual, &predicted);

    Ok(ForecastReport {
        predictor_names: features.predictors().iter().map(|(name, _)| *name).collect(),
        test_dates: features.table.dates[split.train_rows..].to_vec(),
        model,
        split,
        actual,
        predicted,
        mae,
        r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn split_sizes_follow_floor_of_eighty_percent() {
        assert_eq!(chronological_split(10), Split { train_rows: 8, test_rows: 2 });
        assert_eq!(chronological_split(7), Split { train_rows: 5, test_rows: 2 });
        assert_eq!(chronological_split(1), Split { train_rows: 0, test_rows: 1 });
        for total in 0..200 {
            let split = chronological_split(total);
            assert_eq!(split.train_rows + split.test_rows, total);
            assert_eq!(split.train_rows, total * 4 / 5);
        }
    }

    #[test]
    fn exact_linear_relation_is_recovered() {
        let x = array![
            [1.0, 2.0],
            [2.0, 1.0],
            [3.0, 5.0],
            [4.0, 3.0],
            [5.0, 8.0],
            [6.0, 2.0]
        ];
        let y = x.map_axis(Axis(1), |row| 3.0 + 2.0 * row[0] - 0.5 * row[1]);

        let model = LinearModel::fit(x.view(), y.view()).unwrap();
        assert_abs_diff_eq!(model.intercept, 3.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.coefficients[0], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.coefficients[1], -0.5, epsilon = 1e-8);

        let predicted = model.predict(array![[10.0, 4.0]].view());
        assert_abs_diff_eq!(predicted[0], 21.0, epsilon = 1e-8);
    }

    #[test]
    fn collinear_columns_still_fit() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];
        let y = array![5.0, 9.0, 13.0, 17.0];
        let model = LinearModel::fit(x.view(), y.view()).unwrap();
        let fitted = model.predict(x.view());
        for (f, t) in fitted.iter().zip(y.iter()) {
            assert_abs_diff_eq!(*f, *t, epsilon = 1e-8);
        }
    }

    #[test]
    fn too_few_training_rows() {
        let x = array![[1.0, 2.0], [2.0, 1.0]];
        let y = array![1.0, 2.0];
        match LinearModel::fit(x.view(), y.view()) {
            Err(ForecastError::InsufficientRows {
                found, required, ..
            }) => {
                assert_eq!(found, 2);
                assert_eq!(required, 3);
            }
            other => panic!("Expected InsufficientRows, got {other:?}"),
        }
    }
}
