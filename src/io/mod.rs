//! Input/output helpers.
//!
//! - keyed JSON object stores (`store`)
//! - object and file naming (`keys`)
//! - event-count grids of the data sources (`events`)
//! - analysis setup overrides (`setup`)
//! - flat CSV export of results (`export`)

pub mod events;
pub mod export;
pub mod keys;
pub mod setup;
pub mod store;

pub use events::*;
pub use export::*;
pub use keys::*;
pub use setup::*;
pub use store::*;
