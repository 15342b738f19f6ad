//! Efficiency and primary-fraction correction of raw yields.
//!
//! Per in-range bin `i`:
//!
//! ```text
//! corrected_i     = raw_i * primary_i / eff_i
//! corrected_err_i = corrected_i * sqrt((eff_err_i / eff_i)^2 + (raw_err_i / raw_i)^2)
//! ```
//!
//! The primary fraction is treated as exact and the two relative errors as
//! uncorrelated. A zero or undefined efficiency or raw yield leaves the bin
//! undefined (NaN) and is recorded as a [`DegenerateBin`].

use crate::correction::primary::{PrimaryFractionSet, PrimarySelection};
use crate::domain::{BinRange, CorrectedSpectrum, DegenerateBin, Species};
use crate::error::{Result, SpectraError};
use crate::hist::BinnedSeries;

/// Identification of the spectrum being corrected (names and diagnostics).
#[derive(Debug, Clone)]
pub struct CorrectionContext {
    pub species: Species,
    pub class_label: String,
    /// Name of the output series.
    pub name: String,
}

/// Correct `raw` for efficiency and primary fraction over `range`.
///
/// Bins outside `range` stay at zero content and zero error.
pub fn correct(
    raw: &BinnedSeries,
    efficiency: &BinnedSeries,
    primary: &PrimaryFractionSet,
    selection: PrimarySelection,
    range: BinRange,
    ctx: &CorrectionContext,
) -> Result<CorrectedSpectrum> {
    raw.check_range(range.first, range.last)?;
    raw.check_binning(efficiency)?;
    if selection.needs_tabulated() {
        if let Some(tab) = &primary.tabulated {
            raw.check_binning(tab)?;
        }
    }

    let mut series = efficiency
        .empty_like(ctx.name.clone())
        .with_title(format!("{}, {}", ctx.species.display_name(), ctx.class_label));
    let mut degenerate = Vec::new();

    for i in range.iter() {
        let raw_yield = raw.content(i);
        let raw_err = raw.error(i);
        let eff = efficiency.content(i);
        let eff_err = efficiency.error(i);
        let momentum = raw.center(i);

        let source = selection
            .choose(primary, momentum)
            .ok_or_else(|| SpectraError::MissingInput {
                store: format!("primary-fraction inputs for {} {}", ctx.species, ctx.class_label),
                key: "tabulated primary fraction".to_string(),
            })?;
        let fraction = source.fraction(i, momentum);
        tracing::debug!(
            class = %ctx.class_label,
            species = %ctx.species,
            bin = i,
            momentum,
            source = source.kind_name(),
            fraction,
            "primary fraction"
        );

        if eff == 0.0 || raw_yield == 0.0 || !(eff.is_finite() && raw_yield.is_finite()) {
            tracing::warn!(
                class = %ctx.class_label,
                species = %ctx.species,
                bin = i,
                momentum,
                efficiency = eff,
                raw_yield,
                "degenerate division in correction; bin left undefined"
            );
            degenerate.push(DegenerateBin {
                bin: i,
                momentum,
                raw_yield,
                efficiency: eff,
            });
            series.set(i, f64::NAN, f64::NAN);
            continue;
        }

        let (value, error) = corrected_value(raw_yield, raw_err, eff, eff_err, fraction);
        series.set(i, value, error);
    }

    Ok(CorrectedSpectrum {
        species: ctx.species,
        series,
        range,
        degenerate,
    })
}

/// Corrected value and its propagated uncertainty for one bin.
pub fn corrected_value(raw_yield: f64, raw_err: f64, eff: f64, eff_err: f64, fraction: f64) -> (f64, f64) {
    let value = raw_yield * fraction / eff;
    let rel_eff = eff_err / eff;
    let rel_raw = raw_err / raw_yield;
    let error = value * (rel_eff * rel_eff + rel_raw * rel_raw).sqrt();
    (value, error.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CurveFunction;

    fn ctx() -> CorrectionContext {
        CorrectionContext {
            species: Species::Antimatter,
            class_label: "0-5%".into(),
            name: "fASpectra_0_5".into(),
        }
    }

    /// 15 bins of width 1 on [0, 15): bin i is centered at i - 0.5.
    fn inputs(raw_value: f64, eff_value: f64) -> (BinnedSeries, BinnedSeries, PrimaryFractionSet) {
        let mut raw = BinnedSeries::uniform("raw", 15, 0.0, 15.0).unwrap();
        let mut eff = raw.empty_like("eff");
        let mut tab = raw.empty_like("prim");
        for i in 1..=15 {
            raw.set(i, raw_value, raw_value / 10.0);
            eff.set(i, eff_value, eff_value / 10.0);
            tab.set(i, 0.5, 0.0);
        }
        let set = PrimaryFractionSet {
            tabulated: Some(tab),
            fitted: CurveFunction::Constant { value: 0.9 },
        };
        (raw, eff, set)
    }

    #[test]
    fn reference_bin_value_and_error() {
        let (value, error) = corrected_value(100.0, 10.0, 0.5, 0.05, 0.9);
        assert!((value - 180.0).abs() < 1e-9);
        assert!((error - 180.0 * 0.02_f64.sqrt()).abs() < 1e-9);
        assert!((error - 25.456).abs() < 1e-3);
    }

    #[test]
    fn bins_outside_range_stay_zero() {
        let (raw, eff, set) = inputs(100.0, 0.5);
        let range = BinRange { first: 3, last: 11 };
        let out = correct(&raw, &eff, &set, PrimarySelection::FittedOnly, range, &ctx()).unwrap();
        for (i, content, error) in out.series.bins() {
            if range.contains(i) {
                assert!((content - 180.0).abs() < 1e-9, "bin {i}");
                assert!(error > 0.0);
            } else {
                assert_eq!(content, 0.0, "bin {i}");
                assert_eq!(error, 0.0, "bin {i}");
            }
        }
        assert_eq!(out.series.name(), "fASpectra_0_5");
        assert_eq!(out.series.title(), "Antimatter, 0-5%");
    }

    #[test]
    fn selection_policy_switches_at_threshold() {
        let (raw, eff, set) = inputs(100.0, 0.5);
        let range = BinRange { first: 3, last: 13 };
        let policy = PrimarySelection::from_flag(false, 6.3);
        let out = correct(&raw, &eff, &set, policy, range, &ctx()).unwrap();
        // Bin 6 is centered at 5.5 (tabulated 0.5), bin 8 at 7.5 (fitted 0.9).
        assert!((out.series.content(6) - 100.0).abs() < 1e-9);
        assert!((out.series.content(8) - 180.0).abs() < 1e-9);
        // Bin 7 is centered at 6.5, above the threshold.
        assert!((out.series.content(7) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn zero_efficiency_is_flagged_not_fatal() {
        let (raw, mut eff, set) = inputs(100.0, 0.5);
        eff.set(5, 0.0, 0.0);
        let range = BinRange { first: 3, last: 13 };
        let out = correct(&raw, &eff, &set, PrimarySelection::FittedOnly, range, &ctx()).unwrap();
        assert_eq!(out.degenerate.len(), 1);
        assert_eq!(out.degenerate[0].bin, 5);
        assert!(out.series.content(5).is_nan());
        assert!(!out.is_defined(5));
        assert!(out.is_defined(6));
    }

    #[test]
    fn undefined_raw_yield_is_flagged() {
        let (mut raw, mut eff, set) = inputs(100.0, 0.5);
        raw.set(4, f64::NAN, f64::NAN);
        eff.set(4, 0.0, 0.0);
        let range = BinRange { first: 3, last: 13 };
        let out = correct(&raw, &eff, &set, PrimarySelection::FittedOnly, range, &ctx()).unwrap();
        assert_eq!(out.degenerate.len(), 1);
        assert_eq!(out.degenerate[0].bin, 4);
        assert!(out.degenerate[0].raw_yield.is_nan());
        assert!(!out.is_defined(4));
    }

    #[test]
    fn zero_raw_yield_is_flagged() {
        let (mut raw, eff, set) = inputs(100.0, 0.5);
        raw.set(4, 0.0, 1.0);
        let range = BinRange { first: 3, last: 13 };
        let out = correct(&raw, &eff, &set, PrimarySelection::FittedOnly, range, &ctx()).unwrap();
        assert_eq!(out.degenerate.iter().map(|d| d.bin).collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn mismatched_binning_is_an_error() {
        let (raw, _, set) = inputs(100.0, 0.5);
        let eff = BinnedSeries::uniform("eff", 14, 0.0, 14.0).unwrap();
        let range = BinRange { first: 3, last: 13 };
        let err = correct(&raw, &eff, &set, PrimarySelection::FittedOnly, range, &ctx()).unwrap_err();
        assert!(matches!(err, SpectraError::BinningMismatch { .. }));
    }

    #[test]
    fn missing_tabulated_fraction_below_threshold_is_missing_input() {
        let (raw, eff, mut set) = inputs(100.0, 0.5);
        set.tabulated = None;
        let range = BinRange { first: 3, last: 13 };
        let policy = PrimarySelection::from_flag(false, 6.3);
        let err = correct(&raw, &eff, &set, policy, range, &ctx()).unwrap_err();
        assert!(matches!(err, SpectraError::MissingInput { .. }));
    }
}
