//! Synthetic input generation for demos and end-to-end tests.

pub mod sample;

pub use sample::*;
