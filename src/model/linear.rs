//! Linear baseline: ordinary least squares over the encoded features.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::math::solve_least_squares;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fit `y ≈ intercept + x · coefficients`. `None` if the solve fails.
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Option<Self> {
        let n = y.len();
        let p = x.first().map(Vec::len)?;
        if n == 0 || x.len() != n {
            return None;
        }

        let design = DMatrix::from_fn(n, p + 1, |i, j| if j == 0 { 1.0 } else { x[i][j - 1] });
        let target = DVector::from_column_slice(y);
        let beta = solve_least_squares(&design, &target)?;

        Some(Self {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }
}
