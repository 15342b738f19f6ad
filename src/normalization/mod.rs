//! Per-event, per-bin-width normalization of corrected spectra.
//!
//! Each data source contributes the event count found at a fixed reference
//! bin of its normalization grid, projected over the centrality class. The
//! counts are summed and every bin is divided by the total (and optionally by
//! its width) to obtain `1/N_ev d²N/dp_T dy`.

use crate::domain::{CentralityClass, CorrectedSpectrum};
use crate::error::{Result, SpectraError};
use crate::hist::EventCountGrid;

/// Event counts of one centrality class, one entry per data source.
pub fn class_event_counts(
    grids: &[EventCountGrid],
    class: &CentralityClass,
    reference_bin: usize,
) -> Result<Vec<f64>> {
    grids
        .iter()
        .map(|grid| {
            let projection = grid.project_y("norm", class.norm_bins.0, class.norm_bins.1)?;
            if reference_bin == 0 || reference_bin > projection.n_bins() {
                return Err(SpectraError::InvalidRange {
                    first: reference_bin,
                    last: reference_bin,
                    n_bins: projection.n_bins(),
                });
            }
            Ok(projection.content(reference_bin))
        })
        .collect()
}

/// Normalize `spectrum` by the summed `event_counts`.
///
/// Fails with [`SpectraError::NonPositiveNormalization`] when the total is not
/// a positive finite number.
pub fn normalize(
    spectrum: &CorrectedSpectrum,
    event_counts: &[f64],
    bin_width_scaling: bool,
    class_label: &str,
) -> Result<CorrectedSpectrum> {
    let total: f64 = event_counts.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(SpectraError::NonPositiveNormalization {
            class: class_label.to_string(),
            events: total,
        });
    }

    Ok(CorrectedSpectrum {
        species: spectrum.species,
        series: spectrum.series.scaled(1.0 / total, bin_width_scaling),
        range: spectrum.range,
        degenerate: spectrum.degenerate.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BinRange, Species};
    use crate::hist::BinnedSeries;

    fn spectrum(edges: Vec<f64>) -> CorrectedSpectrum {
        let mut series = BinnedSeries::new("fMSpectra_0_5", edges).unwrap();
        for i in 1..=series.n_bins() {
            series.set(i, 500.0, 50.0);
        }
        CorrectedSpectrum {
            species: Species::Matter,
            series,
            range: BinRange { first: 1, last: 3 },
            degenerate: Vec::new(),
        }
    }

    #[test]
    fn unit_width_bins_scale_by_events_only() {
        let s = spectrum(vec![0.0, 1.0, 2.0, 3.0]);
        let out = normalize(&s, &[1000.0], true, "0-5%").unwrap();
        for (_, content, error) in out.series.bins() {
            assert_eq!(content, 500.0 * (1.0 / 1000.0));
            assert_eq!(error, 50.0 * (1.0 / 1000.0));
        }
        let again = normalize(&s, &[1000.0], true, "0-5%").unwrap();
        assert_eq!(out, again);
    }

    #[test]
    fn width_scaling_divides_by_bin_width() {
        let s = spectrum(vec![0.0, 0.5, 1.5, 3.5]);
        let out = normalize(&s, &[600.0, 400.0], true, "0-5%").unwrap();
        assert!((out.series.content(1) - 1.0).abs() < 1e-12);
        assert!((out.series.content(3) - 0.25).abs() < 1e-12);
        let flat = normalize(&s, &[1000.0], false, "0-5%").unwrap();
        assert!((flat.series.content(3) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_positive_total_is_fatal() {
        let s = spectrum(vec![0.0, 1.0, 2.0, 3.0]);
        for counts in [&[][..], &[0.0][..], &[10.0, -20.0][..]] {
            assert!(matches!(
                normalize(&s, counts, true, "0-5%"),
                Err(SpectraError::NonPositiveNormalization { .. })
            ));
        }
    }

    #[test]
    fn event_counts_read_reference_bin_per_source() {
        let grid = |scale: f64| EventCountGrid {
            name: "fNormalisationHist".into(),
            x_edges: vec![0.0, 5.0, 10.0],
            y_edges: vec![0.0, 1.0, 2.0, 3.0, 4.0],
            counts: vec![
                vec![9.0, 8.0, 7.0, 6.0 * scale],
                vec![9.0, 8.0, 7.0, 4.0 * scale],
            ],
        };
        let class = CentralityClass {
            low: 0.0,
            high: 10.0,
            norm_bins: (1, 2),
        };
        let counts = class_event_counts(&[grid(1.0), grid(10.0)], &class, 4).unwrap();
        assert_eq!(counts, vec![10.0, 100.0]);
        assert!(class_event_counts(&[grid(1.0)], &class, 5).is_err());
    }
}
