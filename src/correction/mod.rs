//! Per-bin correction of raw yields.
//!
//! - `primary`: primary-fraction providers and the selection policy
//! - `engine`: the efficiency/primary correction with error propagation

pub mod engine;
pub mod primary;

pub use engine::*;
pub use primary::*;
