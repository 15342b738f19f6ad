//! Command-line parsing for the spectra pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the correction/fit code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{CutSettings, WriteMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "spectra",
    version,
    about = "Corrected He3 spectra and antimatter/matter ratios per centrality class"
)]
pub struct Cli {
    /// Log verbosity (trace, debug, info, warn, error). Logs go to stderr.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Correct, normalize and compare spectra for every centrality class.
    Run(RunArgs),
    /// Generate a consistent synthetic input set (signal, efficiency, primary, data files).
    Simulate(SimulateArgs),
    /// List the objects stored in a store file.
    Show(ShowArgs),
}

/// Selection cuts; they pick the signal sub-directory.
#[derive(Debug, Args, Clone)]
pub struct CutArgs {
    /// DCA_z cut (cm).
    #[arg(long, default_value_t = 1.0)]
    pub cut_dcaz: f32,

    /// Minimum number of TPC clusters.
    #[arg(long, default_value_t = 89)]
    pub cut_tpc_cls: i32,

    /// Signal from bin counting (true) or from the fit integral (false).
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub bin_counting: bool,

    /// Background shape index used by the signal extraction.
    #[arg(long, default_value_t = 1)]
    pub bkg_shape: i32,
}

impl CutArgs {
    pub fn to_settings(&self) -> CutSettings {
        CutSettings {
            cut_dcaz: self.cut_dcaz,
            cut_tpc_cls: self.cut_tpc_cls,
            bin_counting: self.bin_counting,
            bkg_shape: self.bkg_shape,
        }
    }
}

/// Input store locations, shared by `run` and `simulate`.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Directory holding the per-source data files.
    #[arg(long, env = "SPECTRA_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Directory holding the signal/efficiency/primary stores and the output.
    #[arg(long, env = "SPECTRA_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Data file stem; one file per source, `<stem>_<source>.json`.
    #[arg(long, default_value = "AnalysisResults")]
    pub data_file: String,

    /// Signal store stem.
    #[arg(long, default_value = "SignalHe3")]
    pub signal_file: String,

    /// Efficiency store stem.
    #[arg(long, default_value = "EfficiencyHe3")]
    pub eff_file: String,

    /// Primary-fraction store stem.
    #[arg(long, default_value = "PrimaryHe3")]
    pub prim_file: String,

    /// Analysis setup JSON (centrality classes, sources, ranges). Built-in default otherwise.
    #[arg(long, value_name = "JSON")]
    pub setup: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub cuts: CutArgs,

    #[command(flatten)]
    pub inputs: InputArgs,

    /// Always use the fitted primary-fraction curve.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub sigmoid_correction: bool,

    /// Directory inside the output store for the results.
    #[arg(long, default_value = ".")]
    pub histo_dir: String,

    /// Output store stem.
    #[arg(long, default_value = "SpectraHe3")]
    pub out_file: String,

    /// Replace the output store or add to it.
    #[arg(long, value_enum, default_value_t = WriteMode::Recreate)]
    pub out_option: WriteMode,

    /// Do not divide spectra by the bin width.
    #[arg(long)]
    pub no_bin_width: bool,

    /// Export every spectrum and ratio bin to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Worker threads for the class loop (0 = all cores).
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub cuts: CutArgs,

    #[command(flatten)]
    pub inputs: InputArgs,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Selected events per centrality percent and data source.
    #[arg(long, default_value_t = 2.0e6)]
    pub events_per_percent: f64,

    /// True antimatter/matter ratio.
    #[arg(long, default_value_t = 0.95)]
    pub ratio: f64,

    /// Inverse slope of the true spectrum (GeV/c).
    #[arg(long, default_value_t = 1.1)]
    pub slope: f64,
}

#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    /// Store file to list.
    #[arg(value_name = "STORE")]
    pub store: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["spectra", "run"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(cli.log_level, tracing::Level::INFO);
        assert_eq!(args.cuts.to_settings().signal_dir(), "1.0_89_1_1");
        assert!(args.sigmoid_correction);
        assert!(!args.no_bin_width);
        assert_eq!(args.out_option, WriteMode::Recreate);
        assert_eq!(args.inputs.signal_file, "SignalHe3");
        assert_eq!(args.histo_dir, ".");
    }

    #[test]
    fn bool_flags_take_values() {
        let cli = Cli::try_parse_from([
            "spectra",
            "--log-level",
            "debug",
            "run",
            "--bin-counting",
            "false",
            "--sigmoid-correction",
            "false",
            "--out-option",
            "update",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        assert!(!args.cuts.bin_counting);
        assert!(!args.sigmoid_correction);
        assert_eq!(args.out_option, WriteMode::Update);
    }

    #[test]
    fn show_requires_a_store() {
        assert!(Cli::try_parse_from(["spectra", "show"]).is_err());
    }
}
