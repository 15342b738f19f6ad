//! Primary-fraction sources and the policy choosing between them.
//!
//! Two providers exist for every (species, class):
//!
//! - the tabulated fraction, one value per momentum bin
//! - a continuous curve fitted to it, evaluable at any momentum
//!
//! [`PrimarySelection`] decides per bin which one supplies the correction. The
//! choice changes results near the threshold, so it is kept as a named policy.

use crate::hist::BinnedSeries;
use crate::models::CurveFunction;

/// The primary-fraction inputs available for one (species, class).
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryFractionSet {
    pub tabulated: Option<BinnedSeries>,
    pub fitted: CurveFunction,
}

/// One provider of the primary fraction, borrowed from a [`PrimaryFractionSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimaryFractionSource<'a> {
    Tabulated(&'a BinnedSeries),
    Fitted(&'a CurveFunction),
}

impl PrimaryFractionSource<'_> {
    /// Fraction of primaries for `bin`, whose center is at `momentum`.
    ///
    /// Tabulated values are looked up by bin index; the curve is evaluated at
    /// the momentum.
    pub fn fraction(&self, bin: usize, momentum: f64) -> f64 {
        match self {
            PrimaryFractionSource::Tabulated(series) => series.content(bin),
            PrimaryFractionSource::Fitted(curve) => curve.eval(momentum),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            PrimaryFractionSource::Tabulated(_) => "tabulated",
            PrimaryFractionSource::Fitted(_) => "fitted",
        }
    }
}

/// Policy selecting the primary-fraction source per bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimarySelection {
    /// Always evaluate the fitted curve.
    FittedOnly,
    /// Use the tabulated value for bins centered strictly below `threshold`,
    /// the fitted curve elsewhere.
    TabulatedBelow { threshold: f64 },
}

impl PrimarySelection {
    /// Build the policy from the run flag: a continuous correction means
    /// [`PrimarySelection::FittedOnly`].
    pub fn from_flag(use_continuous_fraction: bool, threshold: f64) -> Self {
        if use_continuous_fraction {
            PrimarySelection::FittedOnly
        } else {
            PrimarySelection::TabulatedBelow { threshold }
        }
    }

    /// Whether the tabulated series can be consulted at all.
    pub fn needs_tabulated(self) -> bool {
        matches!(self, PrimarySelection::TabulatedBelow { .. })
    }

    /// Source to use for a bin centered at `momentum`.
    ///
    /// Returns `None` only when the tabulated series is required but absent.
    pub fn choose(self, set: &PrimaryFractionSet, momentum: f64) -> Option<PrimaryFractionSource<'_>> {
        match self {
            PrimarySelection::TabulatedBelow { threshold } if momentum < threshold => {
                set.tabulated.as_ref().map(PrimaryFractionSource::Tabulated)
            }
            _ => Some(PrimaryFractionSource::Fitted(&set.fitted)),
        }
    }
}
