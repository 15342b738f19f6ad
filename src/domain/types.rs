//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between the pipeline stages
//! - persisted in an output object store
//! - loaded back for inspection (`spectra show`)

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};
use crate::hist::BinnedSeries;

/// Matter or antimatter instance of the analysed particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Antimatter,
    Matter,
}

impl Species {
    pub const ALL: [Species; 2] = [Species::Antimatter, Species::Matter];

    /// Tag used inside stored object names (`fATPCrawYield_...`).
    pub fn tag(self) -> &'static str {
        match self {
            Species::Antimatter => "A",
            Species::Matter => "M",
        }
    }

    /// Human-readable label for titles.
    pub fn display_name(self) -> &'static str {
        match self {
            Species::Antimatter => "Antimatter",
            Species::Matter => "Matter",
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A percentile interval `[low, high)` of event centrality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityClass {
    pub low: f64,
    pub high: f64,
    /// Inclusive 1-based x-bin bounds of the class in the event-count grid.
    pub norm_bins: (usize, usize),
}

impl CentralityClass {
    /// Suffix used in object names, e.g. `0_5`.
    pub fn suffix(&self) -> String {
        format!("{:.0}_{:.0}", self.low, self.high)
    }

    /// Label for titles and logs, e.g. `0-5%`.
    pub fn label(&self) -> String {
        format!("{:.0}-{:.0}%", self.low, self.high)
    }
}

/// Inclusive 1-based momentum-bin range `[first, last]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRange {
    pub first: usize,
    pub last: usize,
}

impl BinRange {
    pub fn contains(self, bin: usize) -> bool {
        (self.first..=self.last).contains(&bin)
    }

    pub fn iter(self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Fixed tables of the analysis, passed explicitly into the pipeline.
///
/// Missing fields fall back to the defaults when loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSetup {
    /// Centrality classes ordered by ascending percentile; the last is the most peripheral.
    pub centrality_classes: Vec<CentralityClass>,
    /// Labels of the data sources contributing event counts.
    pub data_sources: Vec<String>,
    /// List holding the normalization grid inside each data file.
    pub norm_list: String,
    /// Name of the normalization grid inside `norm_list`.
    pub norm_histogram: String,
    /// y-bin of the projected grid holding the selected event count.
    pub norm_reference_bin: usize,
    /// Below this momentum the tabulated primary fraction may be used.
    pub primary_momentum_threshold: f64,
    pub pt_range: BinRange,
    /// Narrower range used for the most peripheral class.
    pub peripheral_pt_range: BinRange,
    /// Matter content at or below this value leaves the ratio bin unset.
    pub ratio_epsilon: f64,
}

impl Default for AnalysisSetup {
    fn default() -> Self {
        let classes = [(0.0, 5.0, 1, 1), (5.0, 10.0, 2, 2), (10.0, 30.0, 3, 4), (30.0, 50.0, 5, 6), (50.0, 90.0, 7, 10)];
        AnalysisSetup {
            centrality_classes: classes
                .iter()
                .map(|&(low, high, a, b)| CentralityClass {
                    low,
                    high,
                    norm_bins: (a, b),
                })
                .collect(),
            data_sources: vec!["LHC18q".to_string(), "LHC18r".to_string()],
            norm_list: "mpuccio_he3_".to_string(),
            norm_histogram: "fNormalisationHist".to_string(),
            norm_reference_bin: 4,
            primary_momentum_threshold: 6.3,
            pt_range: BinRange { first: 3, last: 13 },
            peripheral_pt_range: BinRange { first: 3, last: 11 },
            ratio_epsilon: 1e-10,
        }
    }
}

impl AnalysisSetup {
    /// Momentum-bin range for the class at `index`.
    pub fn pt_range_for(&self, index: usize) -> BinRange {
        if index + 1 == self.centrality_classes.len() {
            self.peripheral_pt_range
        } else {
            self.pt_range
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.centrality_classes.is_empty() {
            return Err(SpectraError::InvalidSetup("no centrality classes".into()));
        }
        for pair in self.centrality_classes.windows(2) {
            if pair[1].low < pair[0].low {
                return Err(SpectraError::InvalidSetup(format!(
                    "centrality classes must be in ascending order ({} after {})",
                    pair[1].label(),
                    pair[0].label()
                )));
            }
        }
        if let Some(c) = self
            .centrality_classes
            .iter()
            .find(|c| !(c.high > c.low) || c.norm_bins.0 == 0 || c.norm_bins.0 > c.norm_bins.1)
        {
            return Err(SpectraError::InvalidSetup(format!(
                "centrality class {} has invalid limits or normalization bins {:?}",
                c.label(),
                c.norm_bins
            )));
        }
        if self.data_sources.is_empty() {
            return Err(SpectraError::InvalidSetup("no data sources".into()));
        }
        if self.norm_reference_bin == 0 {
            return Err(SpectraError::InvalidSetup("normalization reference bin is 1-based".into()));
        }
        for range in [self.pt_range, self.peripheral_pt_range] {
            if range.first == 0 || range.first > range.last {
                return Err(SpectraError::InvalidSetup(format!(
                    "invalid momentum-bin range [{}, {}]",
                    range.first, range.last
                )));
            }
        }
        if !(self.ratio_epsilon.is_finite() && self.ratio_epsilon >= 0.0) {
            return Err(SpectraError::InvalidSetup("ratio epsilon must be finite and >= 0".into()));
        }
        Ok(())
    }
}

/// Analysis cuts and variant selectors used to look up the raw yields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutSettings {
    pub cut_dcaz: f32,
    pub cut_tpc_cls: i32,
    pub bin_counting: bool,
    pub bkg_shape: i32,
}

impl CutSettings {
    /// Directory of the signal store holding the raw yields for these cuts.
    pub fn signal_dir(&self) -> String {
        format!(
            "{:.1}_{}_{}_{}",
            self.cut_dcaz,
            self.cut_tpc_cls,
            u8::from(self.bin_counting),
            self.bkg_shape
        )
    }
}

/// How the output store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Start from an empty store, replacing any existing file.
    Recreate,
    /// Load the existing store (if any) and add or replace objects.
    Update,
}

/// A full run's configuration as understood by the pipeline.
#[derive(Debug, Clone)]
pub struct SpectraConfig {
    pub cuts: CutSettings,
    /// Always use the fitted primary-fraction curve.
    pub sigmoid_correction: bool,
    pub bin_width_scaling: bool,

    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub data_file: String,
    pub signal_file: String,
    pub eff_file: String,
    pub prim_file: String,
    pub out_file: String,
    pub out_dir_name: String,
    pub write_mode: WriteMode,

    pub export_csv: Option<PathBuf>,
    pub threads: usize,
    pub setup: AnalysisSetup,
}

/// Outcome of a constant fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FitStatus {
    Converged,
    Failed { reason: String },
}

/// Result of fitting a ratio series to a flat line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub status: FitStatus,
    pub value: f64,
    pub uncertainty: f64,
    pub chi2: f64,
    pub ndf: usize,
    pub n_points: usize,
    /// Chi-square probability; `None` when `ndf == 0`.
    pub probability: Option<f64>,
}

impl FitResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        FitResult {
            status: FitStatus::Failed {
                reason: reason.into(),
            },
            value: 0.0,
            uncertainty: 0.0,
            chi2: 0.0,
            ndf: 0,
            n_points: 0,
            probability: None,
        }
    }

    pub fn is_converged(&self) -> bool {
        self.status == FitStatus::Converged
    }

    /// Chi-square per degree of freedom; `None` when `ndf == 0`.
    pub fn reduced_chi2(&self) -> Option<f64> {
        (self.ndf > 0).then(|| self.chi2 / self.ndf as f64)
    }
}

/// An in-range bin whose correction divided by zero or read an undefined input.
///
/// Undefined inputs are kept as NaN and stored as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegenerateBin {
    pub bin: usize,
    pub momentum: f64,
    #[serde(with = "crate::hist::f64_nan_as_null")]
    pub raw_yield: f64,
    #[serde(with = "crate::hist::f64_nan_as_null")]
    pub efficiency: f64,
}

/// Corrected (and, after normalization, per-event differential) spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedSpectrum {
    pub species: Species,
    pub series: BinnedSeries,
    pub range: BinRange,
    /// Bins left undefined (NaN) by a zero efficiency or raw yield.
    pub degenerate: Vec<DegenerateBin>,
}

impl CorrectedSpectrum {
    /// True when bin `i` is in range and carries a defined value.
    pub fn is_defined(&self, i: usize) -> bool {
        self.range.contains(i) && self.series.content(i).is_finite() && self.series.error(i).is_finite()
    }
}

/// Antimatter/matter ratio with its flat-line fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioOutput {
    pub series: BinnedSeries,
    pub range: BinRange,
    pub fit: FitResult,
}

/// Everything computed for one centrality class.
///
/// A species whose inputs failed is `None`; the ratio needs both.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassOutput {
    pub class: CentralityClass,
    pub events: f64,
    pub antimatter: Option<CorrectedSpectrum>,
    pub matter: Option<CorrectedSpectrum>,
    pub ratio: Option<RatioOutput>,
}

impl ClassOutput {
    pub fn spectrum(&self, species: Species) -> Option<&CorrectedSpectrum> {
        match species {
            Species::Antimatter => self.antimatter.as_ref(),
            Species::Matter => self.matter.as_ref(),
        }
    }

    /// Undefined bins over the available spectra.
    pub fn degenerate_count(&self) -> usize {
        Species::ALL
            .into_iter()
            .filter_map(|species| self.spectrum(species))
            .map(|s| s.degenerate.len())
            .sum()
    }
}
