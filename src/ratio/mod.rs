//! Antimatter/matter ratio with propagated uncertainty and flat-line fit.
//!
//! Per bin of the range:
//!
//! ```text
//! ratio_i     = anti_i / matter_i
//! ratio_err_i = ratio_i * sqrt((anti_err_i / anti_i)^2 + (matter_err_i / matter_i)^2)
//! ```
//!
//! Bins where the matter content does not exceed `epsilon` are statistically
//! empty and stay unset. Bins where either spectrum is undefined stay unset
//! as well.

use crate::domain::{BinRange, CorrectedSpectrum, FitStatus, RatioOutput};
use crate::error::Result;
use crate::fit::fit_constant;

/// Compute the ratio series of `anti / matter` over `range` and fit it to a constant.
pub fn ratio(
    anti: &CorrectedSpectrum,
    matter: &CorrectedSpectrum,
    range: BinRange,
    epsilon: f64,
    name: &str,
    title: &str,
) -> Result<RatioOutput> {
    anti.series.check_binning(&matter.series)?;
    anti.series.check_range(range.first, range.last)?;

    let mut series = anti.series.empty_like(name).with_title(title);

    for i in range.iter() {
        if !(anti.is_defined(i) && matter.is_defined(i)) {
            tracing::debug!(bin = i, title, "ratio bin skipped: undefined spectrum value");
            continue;
        }

        let a = anti.series.content(i);
        let m = matter.series.content(i);
        if m <= epsilon {
            tracing::debug!(bin = i, title, matter = m, "ratio bin left unset: empty denominator");
            continue;
        }

        let (value, error) = ratio_value(a, anti.series.error(i), m, matter.series.error(i));
        if !(value.is_finite() && error.is_finite()) {
            tracing::debug!(bin = i, title, antimatter = a, "ratio bin skipped: undefined error");
            continue;
        }
        series.set(i, value, error);
    }

    let fit = fit_constant(&series, range);
    match &fit.status {
        FitStatus::Converged => tracing::info!(
            title,
            value = fit.value,
            uncertainty = fit.uncertainty,
            chi2 = fit.chi2,
            ndf = fit.ndf,
            "ratio fit"
        ),
        FitStatus::Failed { reason } => {
            tracing::warn!(title, reason = %reason, "ratio fit failed")
        }
    }

    Ok(RatioOutput { series, range, fit })
}

/// Ratio and propagated uncertainty for one bin.
pub fn ratio_value(anti: f64, anti_err: f64, matter: f64, matter_err: f64) -> (f64, f64) {
    let value = anti / matter;
    let rel_a = anti_err / anti;
    let rel_m = matter_err / matter;
    (value, (value * (rel_a * rel_a + rel_m * rel_m).sqrt()).abs())
}
