//! `yield-spectra` library crate.
//!
//! The binary (`spectra`) is a thin wrapper around this library so that:
//!
//! - the correction, normalization and ratio code is testable without spawning processes
//! - the pipeline can be driven from integration tests on synthetic inputs
//! - code stays easy to navigate as the analysis grows

pub mod app;
pub mod cli;
pub mod correction;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod hist;
pub mod io;
pub mod math;
pub mod models;
pub mod normalization;
pub mod ratio;
pub mod report;
