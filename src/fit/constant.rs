//! Flat-line (zeroth-order polynomial) fit of a binned series.
//!
//! Bins enter the fit when they are inside the requested range, their
//! content is finite and their error is finite and strictly positive. Unset
//! ratio bins (zero error) and undefined bins (NaN) are therefore excluded.
//!
//! Failures never propagate as errors: they are reported through
//! [`FitStatus::Failed`] so the caller can persist the diagnostic as is.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::domain::{BinRange, FitResult, FitStatus};
use crate::hist::BinnedSeries;
use crate::math::weighted_least_squares;

/// Fit `series` to a constant over `range`.
pub fn fit_constant(series: &BinnedSeries, range: BinRange) -> FitResult {
    let points: Vec<(f64, f64)> = range
        .iter()
        .filter(|&i| i >= 1 && i <= series.n_bins())
        .map(|i| (series.content(i), series.error(i)))
        .filter(|(c, e)| c.is_finite() && e.is_finite() && *e > 0.0)
        .collect();

    if points.is_empty() {
        return FitResult::failed(format!("no populated bins in [{}, {}]", range.first, range.last));
    }

    let n = points.len();
    let x = DMatrix::from_element(n, 1, 1.0);
    let y = DVector::from_iterator(n, points.iter().map(|p| p.0));
    let sigma = DVector::from_iterator(n, points.iter().map(|p| p.1));

    let Some(solution) = weighted_least_squares(&x, &y, &sigma) else {
        return FitResult::failed("weighted least squares did not converge");
    };

    let value = solution.params[0];
    let variance = solution.covariance[(0, 0)];
    if !(value.is_finite() && variance.is_finite() && variance >= 0.0) {
        return FitResult::failed("non-finite fit parameters");
    }

    let ndf = n - 1;
    let probability = (ndf > 0).then(|| chi2_probability(solution.chi2, ndf)).flatten();

    FitResult {
        status: FitStatus::Converged,
        value,
        uncertainty: variance.sqrt(),
        chi2: solution.chi2,
        ndf,
        n_points: n,
        probability,
    }
}

/// Upper-tail probability of `chi2` for `ndf` degrees of freedom.
fn chi2_probability(chi2: f64, ndf: usize) -> Option<f64> {
    let dist = ChiSquared::new(ndf as f64).ok()?;
    Some((1.0 - dist.cdf(chi2)).clamp(0.0, 1.0))
}
