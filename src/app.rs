//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the log subscriber
//! - dispatches to `run`, `simulate` or `show`

use clap::Parser;

use crate::cli::{Command, InputArgs, RunArgs, ShowArgs, SimulateArgs};
use crate::data::{SimulationLayout, SimulationParams, generate_inputs};
use crate::domain::{AnalysisSetup, SpectraConfig};
use crate::error::AppError;
use crate::io::{ObjectStore, load_setup};

pub mod pipeline;

/// Entry point for the `spectra` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = spectra_config_from_args(&args)?;
    let run = pipeline::run_spectra(&config)?;

    println!("{}", crate::report::format_run_summary(&run, &config));

    if !run.failures.is_empty() {
        return Err(AppError::new(
            3,
            format!(
                "{} failure(s) across {} centrality classes; the available outputs were kept.",
                run.failures.len(),
                config.setup.centrality_classes.len()
            ),
        ));
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let setup = setup_from_args(&args.inputs)?;
    let params = SimulationParams {
        seed: args.seed,
        events_per_percent: args.events_per_percent,
        ratio: args.ratio,
        slope: args.slope,
    };
    let layout = SimulationLayout {
        data_dir: args.inputs.data_dir.clone(),
        out_dir: args.inputs.out_dir.clone(),
        data_file: args.inputs.data_file.clone(),
        signal_file: args.inputs.signal_file.clone(),
        eff_file: args.inputs.eff_file.clone(),
        prim_file: args.inputs.prim_file.clone(),
    };

    let mut inputs = generate_inputs(&setup, &args.cuts.to_settings(), &params, &layout)?;
    let written = inputs.save()?;
    println!(
        "Wrote {written} stores (signal, efficiency, primary, {} data files) for seed {}.",
        inputs.data.len(),
        params.seed
    );
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let store = ObjectStore::open(&args.store)?;
    print!("{}", crate::report::format_store_listing(&store));
    Ok(())
}

fn setup_from_args(inputs: &InputArgs) -> Result<AnalysisSetup, AppError> {
    match &inputs.setup {
        Some(path) => Ok(load_setup(path)?),
        None => Ok(AnalysisSetup::default()),
    }
}

pub fn spectra_config_from_args(args: &RunArgs) -> Result<SpectraConfig, AppError> {
    Ok(SpectraConfig {
        cuts: args.cuts.to_settings(),
        sigmoid_correction: args.sigmoid_correction,
        bin_width_scaling: !args.no_bin_width,

        data_dir: args.inputs.data_dir.clone(),
        out_dir: args.inputs.out_dir.clone(),
        data_file: args.inputs.data_file.clone(),
        signal_file: args.inputs.signal_file.clone(),
        eff_file: args.inputs.eff_file.clone(),
        prim_file: args.inputs.prim_file.clone(),
        out_file: args.out_file.clone(),
        out_dir_name: args.histo_dir.clone(),
        write_mode: args.out_option,

        export_csv: args.export_csv.clone(),
        threads: args.threads,
        setup: setup_from_args(&args.inputs)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    #[test]
    fn run_args_map_onto_config() {
        let cli = Cli::try_parse_from([
            "spectra",
            "run",
            "--no-bin-width",
            "--histo-dir",
            "nominal",
            "--out-file",
            "SpectraHe3_sys",
            "--cut-dcaz",
            "0.5",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = spectra_config_from_args(&args).unwrap();
        assert!(!config.bin_width_scaling);
        assert_eq!(config.out_dir_name, "nominal");
        assert_eq!(config.out_file, "SpectraHe3_sys");
        assert_eq!(config.cuts.signal_dir(), "0.5_89_1_1");
        assert_eq!(config.setup, AnalysisSetup::default());
    }

    #[test]
    fn missing_setup_file_is_an_input_error() {
        let cli = Cli::try_parse_from(["spectra", "run", "--setup", "/nonexistent/setup.json"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(spectra_config_from_args(&args).unwrap_err().exit_code(), 2);
    }
}
