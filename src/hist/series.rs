//! One-dimensional binned data with per-bin uncertainties.
//!
//! Bins are addressed 1..=N. Index 0 (underflow) and N+1 (overflow) exist so
//! that bin numbers line up with the stored histograms, but nothing in the
//! pipeline writes to them.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};

/// A binned series over the momentum axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRepr", into = "SeriesRepr")]
pub struct BinnedSeries {
    name: String,
    title: String,
    edges: Vec<f64>,
    content: Vec<f64>,
    error: Vec<f64>,
}

/// On-disk layout. Contents and errors include the two flow bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeriesRepr {
    name: String,
    #[serde(default)]
    title: String,
    edges: Vec<f64>,
    #[serde(with = "super::nan_as_null")]
    content: Vec<f64>,
    #[serde(with = "super::nan_as_null")]
    error: Vec<f64>,
}

impl TryFrom<SeriesRepr> for BinnedSeries {
    type Error = String;

    fn try_from(repr: SeriesRepr) -> std::result::Result<Self, Self::Error> {
        validate_edges(&repr.edges)?;
        let slots = repr.edges.len() + 1;
        if repr.content.len() != slots || repr.error.len() != slots {
            return Err(format!(
                "series '{}' has {} edges but {} contents and {} errors (expected {slots})",
                repr.name,
                repr.edges.len(),
                repr.content.len(),
                repr.error.len()
            ));
        }
        if repr.error.iter().any(|e| *e < 0.0) {
            return Err(format!("series '{}' has a negative bin error", repr.name));
        }
        Ok(BinnedSeries {
            name: repr.name,
            title: repr.title,
            edges: repr.edges,
            content: repr.content,
            error: repr.error,
        })
    }
}

impl From<BinnedSeries> for SeriesRepr {
    fn from(series: BinnedSeries) -> Self {
        SeriesRepr {
            name: series.name,
            title: series.title,
            edges: series.edges,
            content: series.content,
            error: series.error,
        }
    }
}

fn validate_edges(edges: &[f64]) -> std::result::Result<(), String> {
    if edges.len() < 2 {
        return Err(format!("a series needs at least 2 bin edges, got {}", edges.len()));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err("bin edges must be finite".to_string());
    }
    if edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err("bin edges must be strictly increasing".to_string());
    }
    Ok(())
}

impl BinnedSeries {
    /// Create an empty series with explicit bin edges.
    pub fn new(name: impl Into<String>, edges: Vec<f64>) -> Result<Self> {
        let name = name.into();
        validate_edges(&edges).map_err(|msg| SpectraError::BinningMismatch {
            what: name.clone(),
            expected: "strictly increasing finite edges".to_string(),
            found: msg,
        })?;
        let slots = edges.len() + 1;
        Ok(BinnedSeries {
            name,
            title: String::new(),
            edges,
            content: vec![0.0; slots],
            error: vec![0.0; slots],
        })
    }

    /// Create an empty series with `n_bins` equal-width bins on `[low, high)`.
    pub fn uniform(name: impl Into<String>, n_bins: usize, low: f64, high: f64) -> Result<Self> {
        let n = n_bins.max(1);
        let step = (high - low) / n as f64;
        let edges = (0..=n).map(|i| low + step * i as f64).collect();
        Self::new(name, edges)
    }

    /// An empty series with the same binning, under a new name.
    pub fn empty_like(&self, name: impl Into<String>) -> Self {
        BinnedSeries {
            name: name.into(),
            title: String::new(),
            edges: self.edges.clone(),
            content: vec![0.0; self.content.len()],
            error: vec![0.0; self.error.len()],
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower edge of bin `i` (1-based).
    pub fn low_edge(&self, i: usize) -> f64 {
        self.edges[i - 1]
    }

    /// Upper edge of bin `i` (1-based).
    pub fn up_edge(&self, i: usize) -> f64 {
        self.edges[i]
    }

    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.low_edge(i) + self.up_edge(i))
    }

    pub fn width(&self, i: usize) -> f64 {
        self.up_edge(i) - self.low_edge(i)
    }

    pub fn content(&self, i: usize) -> f64 {
        self.content[i]
    }

    pub fn error(&self, i: usize) -> f64 {
        self.error[i]
    }

    /// Set content and error of bin `i`.
    ///
    /// # Panics
    /// Panics if `i` is not a regular bin (`1..=n_bins`).
    pub fn set(&mut self, i: usize, content: f64, error: f64) {
        assert!(
            (1..=self.n_bins()).contains(&i),
            "bin {i} outside 1..={} of series '{}'",
            self.n_bins(),
            self.name
        );
        self.content[i] = content;
        self.error[i] = error;
    }

    /// Iterate over regular bins as `(index, content, error)`.
    pub fn bins(&self) -> impl Iterator<Item = (usize, f64, f64)> + '_ {
        (1..=self.n_bins()).map(|i| (i, self.content[i], self.error[i]))
    }

    /// Check that `[first, last]` is a non-empty range of regular bins.
    pub fn check_range(&self, first: usize, last: usize) -> Result<()> {
        if first == 0 || first > last || last > self.n_bins() {
            return Err(SpectraError::InvalidRange {
                first,
                last,
                n_bins: self.n_bins(),
            });
        }
        Ok(())
    }

    pub fn same_binning(&self, other: &BinnedSeries) -> bool {
        self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(&other.edges)
                .all(|(a, b)| (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0))
    }

    /// Fail with [`SpectraError::BinningMismatch`] unless `other` shares this axis.
    pub fn check_binning(&self, other: &BinnedSeries) -> Result<()> {
        if self.same_binning(other) {
            return Ok(());
        }
        Err(SpectraError::BinningMismatch {
            what: format!("'{}' vs '{}'", other.name, self.name),
            expected: format!("{} bins on [{}, {}]", self.n_bins(), self.edges[0], self.edges[self.n_bins()]),
            found: format!(
                "{} bins on [{}, {}]",
                other.n_bins(),
                other.edges[0],
                other.edges[other.n_bins()]
            ),
        })
    }

    /// Return a copy with every content and error multiplied by `factor`,
    /// additionally divided by the bin width when `width` is set.
    pub fn scaled(&self, factor: f64, width: bool) -> Self {
        let mut out = self.clone();
        for i in 1..=self.n_bins() {
            let f = if width { factor / self.width(i) } else { factor };
            out.content[i] = self.content[i] * f;
            out.error[i] = self.error[i] * f.abs();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt_axis() -> BinnedSeries {
        BinnedSeries::new("h", vec![1.0, 1.5, 2.0, 3.0, 5.0]).unwrap()
    }

    #[test]
    fn centers_and_widths() {
        let h = pt_axis();
        assert_eq!(h.n_bins(), 4);
        assert!((h.center(3) - 2.5).abs() < 1e-12);
        assert!((h.width(4) - 2.0).abs() < 1e-12);
        assert!((h.low_edge(2) - 1.5).abs() < 1e-12);
        assert!((h.up_edge(2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_edges() {
        assert!(BinnedSeries::new("h", vec![1.0]).is_err());
        assert!(BinnedSeries::new("h", vec![1.0, 1.0, 2.0]).is_err());
    }

    #[test]
    fn scaled_by_width_touches_regular_bins_only() {
        let mut h = pt_axis();
        h.set(4, 10.0, 2.0);
        let s = h.scaled(0.5, true);
        assert!((s.content(4) - 2.5).abs() < 1e-12);
        assert!((s.error(4) - 0.5).abs() < 1e-12);
        assert_eq!(s.content(0), 0.0);
        assert_eq!(s.content(5), 0.0);
    }

    #[test]
    fn binning_check_reports_mismatch() {
        let a = pt_axis();
        let b = BinnedSeries::uniform("b", 4, 1.0, 5.0).unwrap();
        assert!(a.check_binning(&a.empty_like("c")).is_ok());
        assert!(matches!(
            a.check_binning(&b),
            Err(SpectraError::BinningMismatch { .. })
        ));
    }

    #[test]
    fn check_range_bounds() {
        let h = pt_axis();
        assert!(h.check_range(1, 4).is_ok());
        assert!(h.check_range(0, 2).is_err());
        assert!(h.check_range(3, 2).is_err());
        assert!(h.check_range(2, 5).is_err());
    }

    #[test]
    fn json_keeps_undefined_bins() {
        let mut h = pt_axis().with_title("Antimatter, 0-5%");
        h.set(2, f64::NAN, f64::NAN);
        h.set(3, 4.0, 0.5);
        let text = serde_json::to_string(&h).unwrap();
        assert!(text.contains("null"));
        let back: BinnedSeries = serde_json::from_str(&text).unwrap();
        assert!(back.content(2).is_nan());
        assert_eq!(back.content(3), 4.0);
        assert_eq!(back.title(), "Antimatter, 0-5%");
    }

    #[test]
    fn json_rejects_inconsistent_lengths() {
        let text = r#"{"name":"h","edges":[0.0,1.0],"content":[0.0],"error":[0.0,0.0,0.0]}"#;
        assert!(serde_json::from_str::<BinnedSeries>(text).is_err());
    }
}
