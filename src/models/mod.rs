//! Continuous model curves evaluable at arbitrary momentum.

pub mod curve;

pub use curve::*;
