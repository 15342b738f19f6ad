//! Object and file naming conventions.
//!
//! Input names are fixed by the upstream extraction steps; output names
//! follow the same `f<tag><what>_<lo>_<hi>` pattern.

use std::path::{Path, PathBuf};

use crate::domain::{AnalysisSetup, CentralityClass, CutSettings, Species};
use crate::io::store::join_key;

/// Path of a store file `<dir>/<stem>.json`.
pub fn store_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.json"))
}

/// Path of the data file of one data source, `<dir>/<stem>_<label>.json`.
pub fn data_file_path(dir: &Path, stem: &str, label: &str) -> PathBuf {
    dir.join(format!("{stem}_{label}.json"))
}

pub fn raw_yield_key(cuts: &CutSettings, species: Species, class: &CentralityClass) -> String {
    join_key(
        &cuts.signal_dir(),
        &format!("f{}TPCrawYield_{}", species.tag(), class.suffix()),
    )
}

pub fn efficiency_key(species: Species, class: &CentralityClass) -> String {
    format!("f{}Eff_TPC_{}", species.tag(), class.suffix())
}

pub fn primary_fraction_key(species: Species, class: &CentralityClass) -> String {
    format!("f{}PrimFrac_{}", species.tag(), class.suffix())
}

pub fn primary_curve_key(species: Species, class: &CentralityClass) -> String {
    format!("f{}SigmoidFit_{}", species.tag(), class.suffix())
}

pub fn normalization_key(setup: &AnalysisSetup) -> String {
    join_key(&setup.norm_list, &setup.norm_histogram)
}

pub fn spectrum_name(species: Species, class: &CentralityClass) -> String {
    format!("f{}Spectra_{}", species.tag(), class.suffix())
}

pub fn ratio_name(class: &CentralityClass) -> String {
    format!("fRatio_{}", class.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_keys() {
        let class = CentralityClass {
            low: 0.0,
            high: 5.0,
            norm_bins: (1, 1),
        };
        let cuts = CutSettings {
            cut_dcaz: 1.0,
            cut_tpc_cls: 89,
            bin_counting: false,
            bkg_shape: 2,
        };
        assert_eq!(raw_yield_key(&cuts, Species::Antimatter, &class), "1.0_89_0_2/fATPCrawYield_0_5");
        assert_eq!(efficiency_key(Species::Matter, &class), "fMEff_TPC_0_5");
        assert_eq!(primary_fraction_key(Species::Matter, &class), "fMPrimFrac_0_5");
        assert_eq!(primary_curve_key(Species::Antimatter, &class), "fASigmoidFit_0_5");
        assert_eq!(
            normalization_key(&AnalysisSetup::default()),
            "mpuccio_he3_/fNormalisationHist"
        );
    }

    #[test]
    fn file_paths() {
        let dir = Path::new("/data");
        assert_eq!(store_path(dir, "SignalHe3"), PathBuf::from("/data/SignalHe3.json"));
        assert_eq!(
            data_file_path(dir, "AnalysisResults", "LHC18q"),
            PathBuf::from("/data/AnalysisResults_LHC18q.json")
        );
    }
}
