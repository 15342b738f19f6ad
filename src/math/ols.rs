//! Weighted least squares solver.
//!
//! We solve small linear problems of the form:
//!
//! ```text
//! minimize χ² = Σ ((y_i - x_i^T β) / σ_i)^2
//! ```
//!
//! Implementation choices:
//! - Rows are scaled by `1/σ_i` and the resulting ordinary least squares
//!   problem is solved with SVD, which handles tall design matrices.
//! - The parameter covariance is `(AᵀA)⁻¹` of the scaled design matrix `A`.

use nalgebra::{DMatrix, DVector};

/// Parameters, covariance and χ² of a weighted least squares solution.
#[derive(Debug, Clone)]
pub struct WlsSolution {
    pub params: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub chi2: f64,
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `y ≈ X β` with per-row uncertainties `sigma`.
///
/// Returns `None` on shape mismatch, non-positive or non-finite `sigma`, or a
/// singular normal matrix.
pub fn weighted_least_squares(x: &DMatrix<f64>, y: &DVector<f64>, sigma: &DVector<f64>) -> Option<WlsSolution> {
    let n = x.nrows();
    if n == 0 || y.len() != n || sigma.len() != n {
        return None;
    }
    if sigma.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
        return None;
    }

    let mut a = x.clone();
    let mut b = y.clone();
    for i in 0..n {
        let w = 1.0 / sigma[i];
        a.row_mut(i).scale_mut(w);
        b[i] *= w;
    }

    let params = solve_least_squares(&a, &b)?;
    let covariance = (a.transpose() * &a).try_inverse()?;
    let residual = &b - &a * &params;
    let chi2 = residual.norm_squared();

    Some(WlsSolution {
        params,
        covariance,
        chi2,
    })
}
