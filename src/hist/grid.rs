//! Two-dimensional event-count grid used for per-event normalization.
//!
//! The x axis holds centrality bins, the y axis the event-selection stages.
//! A centrality class selects a contiguous x-range; projecting that range onto
//! y gives the event counts per stage.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};
use crate::hist::BinnedSeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCountGrid {
    pub name: String,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    /// `counts[ix][iy]` for 0-based regular bins.
    pub counts: Vec<Vec<f64>>,
}

impl EventCountGrid {
    pub fn n_x(&self) -> usize {
        self.x_edges.len().saturating_sub(1)
    }

    pub fn n_y(&self) -> usize {
        self.y_edges.len().saturating_sub(1)
    }

    /// Sum x-bins `first..=last` (1-based, inclusive) into a series over y.
    ///
    /// Errors are Poisson: `sqrt(sum)`.
    pub fn project_y(&self, name: impl Into<String>, first: usize, last: usize) -> Result<BinnedSeries> {
        if self.counts.len() != self.n_x() || self.counts.iter().any(|row| row.len() != self.n_y()) {
            return Err(SpectraError::BinningMismatch {
                what: format!("event-count grid '{}'", self.name),
                expected: format!("{}x{} counts", self.n_x(), self.n_y()),
                found: format!(
                    "{} rows of lengths {:?}",
                    self.counts.len(),
                    self.counts.iter().map(Vec::len).collect::<Vec<_>>()
                ),
            });
        }
        if first == 0 || first > last || last > self.n_x() {
            return Err(SpectraError::InvalidRange {
                first,
                last,
                n_bins: self.n_x(),
            });
        }

        let mut out = BinnedSeries::new(name, self.y_edges.clone())?;
        for iy in 0..self.n_y() {
            let sum: f64 = self.counts[first - 1..last].iter().map(|row| row[iy]).sum();
            out.set(iy + 1, sum, sum.max(0.0).sqrt());
        }
        Ok(out)
    }
}
