//! Least squares solver.
//!
//! The linear baseline solves `minimize Σ (y_i - x_i^T β)^2` over the encoded
//! feature matrix. One-hot blocks make the design rank-deficient (every block sums
//! to the intercept column), so we solve through SVD, which returns the
//! minimum-norm solution instead of failing on singular systems.
//! (Nalgebra's `QR::solve` is intended for square systems and panics on tall ones.)

use nalgebra::{DMatrix, DVector};

/// Singular-value cutoffs tried in order, tightest first.
const TOLERANCES: [f64; 3] = [1e-10, 1e-8, 1e-6];

/// Solve a least squares problem using SVD.
///
/// Returns `None` if no finite solution is found at any tolerance.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    TOLERANCES
        .into_iter()
        .filter_map(|tol| svd.solve(y, tol).ok())
        .find(|beta| beta.iter().all(|v| v.is_finite()))
}
