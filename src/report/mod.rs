//! Reporting utilities: run summaries and store listings.

pub mod format;

pub use format::*;
