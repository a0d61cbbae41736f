//! Column-wise standardization of the feature matrix

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LensError, Result};

/// Parameters for one fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean
    scale: f64,  // population std, 0 for constant columns
}

/// Standard scaling (z-score normalization): (x - mean) / std.
///
/// Uses the population standard deviation. A column with zero variance is
/// mapped to the constant 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
}

impl StandardScaler {
    /// Fit the scaler to the columns of `values`
    pub fn fit(values: &Array2<f64>) -> Result<Self> {
        if values.nrows() == 0 {
            return Err(LensError::EmptyDataset);
        }

        let n = values.nrows() as f64;
        let params = values
            .axis_iter(Axis(1))
            .map(|column| {
                let mean = column.sum() / n;
                let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                ScalerParams {
                    center: mean,
                    scale: var.sqrt(),
                }
            })
            .collect::<Vec<_>>();

        let constant = params.iter().filter(|p| p.scale == 0.0).count();
        debug!(columns = params.len(), constant, "Fitted standard scaler");

        Ok(Self { params })
    }

    /// Scale a matrix with the fitted parameters
    pub fn transform(&self, values: &Array2<f64>) -> Result<Array2<f64>> {
        if values.ncols() != self.params.len() {
            return Err(LensError::Shape {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", values.ncols()),
            });
        }

        let mut scaled = values.clone();
        for (mut column, params) in scaled.axis_iter_mut(Axis(1)).zip(&self.params) {
            if params.scale == 0.0 {
                column.fill(0.0);
            } else {
                column.mapv_inplace(|v| (v - params.center) / params.scale);
            }
        }
        Ok(scaled)
    }

    /// Fit and transform in one step
    pub fn fit_transform(values: &Array2<f64>) -> Result<(Self, Array2<f64>)> {
        let scaler = Self::fit(values)?;
        let scaled = scaler.transform(values)?;
        Ok((scaler, scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_moments() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let (_, scaled) = StandardScaler::fit_transform(&x).unwrap();

        for column in scaled.axis_iter(Axis(1)) {
            let mean = column.sum() / 4.0;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var.sqrt() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_variance_maps_to_zero() {
        let x = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&x).unwrap();

        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(scaler.params[1].center, 2.0);
        assert_eq!(scaler.params[0].scale, 0.0);
        assert!(scaled.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_column_mismatch() {
        let scaler = StandardScaler::fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let result = scaler.transform(&array![[1.0], [2.0]]);
        assert!(matches!(result, Err(LensError::Shape { .. })));
    }

    #[test]
    fn test_empty_input() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(matches!(StandardScaler::fit(&x), Err(LensError::EmptyDataset)));
    }
}
