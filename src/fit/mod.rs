//! Fits of derived series.
//!
//! Only the flat-line fit of the antimatter/matter ratio is needed; the
//! linear algebra lives in `math`.

pub mod constant;

pub use constant::*;
