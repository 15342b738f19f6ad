//! Normalization provider: event-count grids of the data sources.

use std::path::Path;

use crate::domain::AnalysisSetup;
use crate::error::Result;
use crate::hist::EventCountGrid;
use crate::io::keys::{data_file_path, normalization_key};
use crate::io::store::ObjectStore;

/// Load the event-count grid of every data source in `setup`, in order.
pub fn load_event_grids(dir: &Path, data_file: &str, setup: &AnalysisSetup) -> Result<Vec<EventCountGrid>> {
    let key = normalization_key(setup);
    setup
        .data_sources
        .iter()
        .map(|label| {
            let store = ObjectStore::open(data_file_path(dir, data_file, label))?;
            let grid = store.grid(&key)?.clone();
            tracing::debug!(source = %label, x_bins = grid.n_x(), y_bins = grid.n_y(), "event-count grid loaded");
            Ok(grid)
        })
        .collect()
}
