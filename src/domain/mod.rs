//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - analysis identifiers (`Species`, `CentralityClass`, `BinRange`)
//! - the explicit analysis tables (`AnalysisSetup`) and run configuration (`SpectraConfig`)
//! - pipeline outputs (`CorrectedSpectrum`, `RatioOutput`, `FitResult`, `ClassOutput`)

pub mod types;

pub use types::*;
