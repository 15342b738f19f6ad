//! Synthetic input generation.
//!
//! Produces a consistent set of input stores (signal, efficiency, primary
//! fraction and one data file per source) from a known true spectrum, so the
//! pipeline can be exercised end to end without the upstream extraction.
//!
//! For every (species, class) and momentum bin:
//!
//! ```text
//! expected raw = N_ev * truth(p_T) * width * eff(p_T) / primary(p_T)
//! ```
//!
//! and the observed raw yield is Poisson-distributed around it. Running the
//! pipeline on these inputs recovers `truth` and an antimatter/matter ratio
//! close to `SimulationParams::ratio`.

use std::path::PathBuf;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Normal, Poisson};

use crate::domain::{AnalysisSetup, CutSettings, Species};
use crate::error::AppError;
use crate::hist::{BinnedSeries, EventCountGrid};
use crate::io::{
    ObjectStore, StoredObject, data_file_path, efficiency_key, normalization_key, primary_curve_key,
    primary_fraction_key, raw_yield_key, store_path,
};
use crate::models::CurveFunction;
use crate::normalization::class_event_counts;

/// Momentum-bin edges of the generated histograms (GeV/c).
pub const DEFAULT_PT_EDGES: [f64; 14] = [0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 6.0, 7.0, 8.0, 10.0];

/// Centrality edges (percentile) of the generated event-count grids.
const CENT_EDGES: [f64; 11] = [0.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0];

/// Fraction of events surviving each selection stage; stage 4 is the
/// reference bin of the default setup.
const STAGE_SURVIVAL: [f64; 5] = [1.0, 0.97, 0.93, 0.9, 0.88];

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub seed: u64,
    /// Selected events per centrality percent, per data source.
    pub events_per_percent: f64,
    /// True antimatter/matter ratio.
    pub ratio: f64,
    /// Inverse slope of the true spectrum (GeV/c).
    pub slope: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            seed: 42,
            events_per_percent: 2.0e6,
            ratio: 0.95,
            slope: 1.1,
        }
    }
}

/// Where the generated stores go and under which names.
#[derive(Debug, Clone)]
pub struct SimulationLayout {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub data_file: String,
    pub signal_file: String,
    pub eff_file: String,
    pub prim_file: String,
}

/// Generated stores, not yet written.
#[derive(Debug, Clone)]
pub struct SimulatedInputs {
    pub signal: ObjectStore,
    pub efficiency: ObjectStore,
    pub primary: ObjectStore,
    pub data: Vec<ObjectStore>,
}

impl SimulatedInputs {
    /// Write every store; returns the number of files written.
    pub fn save(&mut self) -> Result<usize, AppError> {
        let mut n = 0;
        for store in [&mut self.signal, &mut self.efficiency, &mut self.primary]
            .into_iter()
            .chain(self.data.iter_mut())
        {
            store.save()?;
            n += 1;
        }
        Ok(n)
    }
}

/// True per-event differential yield of the matter species.
pub fn true_spectrum(pt: f64, slope: f64) -> f64 {
    1.0e-4 * pt * (-pt / slope).exp()
}

/// Efficiency curve used for generation.
pub fn true_efficiency(species: Species, pt: f64) -> f64 {
    let plateau = match species {
        Species::Antimatter => 0.62,
        Species::Matter => 0.66,
    };
    plateau / (1.0 + (-3.0 * (pt - 1.2)).exp())
}

/// Primary-fraction curve used for generation.
pub fn true_primary_curve(species: Species) -> CurveFunction {
    match species {
        Species::Antimatter => CurveFunction::Constant { value: 1.0 },
        Species::Matter => CurveFunction::Sigmoid {
            amplitude: 0.99,
            slope: 2.2,
            midpoint: 1.0,
        },
    }
}

pub fn generate_inputs(
    setup: &AnalysisSetup,
    cuts: &CutSettings,
    params: &SimulationParams,
    layout: &SimulationLayout,
) -> Result<SimulatedInputs, AppError> {
    if !(params.events_per_percent.is_finite() && params.events_per_percent > 0.0) {
        return Err(AppError::new(2, "Events per percent must be > 0."));
    }
    if !(params.ratio.is_finite() && params.ratio > 0.0 && params.slope.is_finite() && params.slope > 0.0) {
        return Err(AppError::new(2, "Ratio and slope must be finite and > 0."));
    }
    setup.validate()?;

    let mut rng = StdRng::seed_from_u64(params.seed);
    let noise = Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    // Event-count grids first: the expected yields depend on them.
    let norm_key = normalization_key(setup);
    let mut grids = Vec::with_capacity(setup.data_sources.len());
    let mut data = Vec::with_capacity(setup.data_sources.len());
    for label in &setup.data_sources {
        let grid = generate_grid(&setup.norm_histogram, params.events_per_percent, &mut rng, &noise);
        let mut store = ObjectStore::empty(data_file_path(&layout.data_dir, &layout.data_file, label));
        store.insert(norm_key.clone(), StoredObject::Grid(grid.clone()));
        grids.push(grid);
        data.push(store);
    }

    let mut signal = ObjectStore::empty(store_path(&layout.out_dir, &layout.signal_file));
    let mut efficiency = ObjectStore::empty(store_path(&layout.out_dir, &layout.eff_file));
    let mut primary = ObjectStore::empty(store_path(&layout.out_dir, &layout.prim_file));

    for class in &setup.centrality_classes {
        let events: f64 = class_event_counts(&grids, class, setup.norm_reference_bin)?.iter().sum();
        // More central events produce more particles.
        let multiplicity = 4.0 * (1.0 - 0.009 * 0.5 * (class.low + class.high));

        for species in Species::ALL {
            let scale = match species {
                Species::Antimatter => params.ratio,
                Species::Matter => 1.0,
            };
            let curve = true_primary_curve(species);
            let raw_key = raw_yield_key(cuts, species, class);
            let raw_name = raw_key.rsplit('/').next().unwrap_or(&raw_key).to_string();
            let mut raw = BinnedSeries::new(raw_name, DEFAULT_PT_EDGES.to_vec())?;
            let mut eff = raw.empty_like(efficiency_key(species, class));
            let mut tab = raw.empty_like(primary_fraction_key(species, class));

            for i in 1..=raw.n_bins() {
                let pt = raw.center(i);
                let e = true_efficiency(species, pt);
                let p = curve.eval(pt);
                eff.set(i, e, 0.01 * e);
                let p_obs = (p + 0.005 * noise.sample(&mut rng)).clamp(0.0, 1.0);
                tab.set(i, p_obs, 0.005);

                let mu = events * multiplicity * scale * true_spectrum(pt, params.slope) * raw.width(i) * e / p;
                let counts = if mu > 0.0 {
                    Poisson::new(mu)
                        .map_err(|err| AppError::new(4, format!("Poisson distribution error: {err}")))?
                        .sample(&mut rng)
                } else {
                    0.0
                };
                raw.set(i, counts, counts.sqrt());
            }

            signal.insert(raw_key, StoredObject::Series(raw));
            efficiency.insert(efficiency_key(species, class), StoredObject::Series(eff));
            primary.insert(primary_fraction_key(species, class), StoredObject::Series(tab));
            primary.insert(primary_curve_key(species, class), StoredObject::Curve(curve));
        }
    }

    Ok(SimulatedInputs {
        signal,
        efficiency,
        primary,
        data,
    })
}

fn generate_grid(name: &str, events_per_percent: f64, rng: &mut StdRng, noise: &Normal<f64>) -> EventCountGrid {
    let counts = CENT_EDGES
        .windows(2)
        .map(|w| {
            let base = events_per_percent * (w[1] - w[0]) * (1.0 + 0.02 * noise.sample(rng)).max(0.5);
            STAGE_SURVIVAL.iter().map(|f| (base * f).round()).collect()
        })
        .collect();
    EventCountGrid {
        name: name.to_string(),
        x_edges: CENT_EDGES.to_vec(),
        y_edges: (0..=STAGE_SURVIVAL.len()).map(|i| i as f64).collect(),
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(dir: &std::path::Path) -> SimulationLayout {
        SimulationLayout {
            data_dir: dir.join("data"),
            out_dir: dir.join("out"),
            data_file: "AnalysisResults".into(),
            signal_file: "SignalHe3".into(),
            eff_file: "EfficiencyHe3".into(),
            prim_file: "PrimaryHe3".into(),
        }
    }

    fn cuts() -> CutSettings {
        CutSettings {
            cut_dcaz: 1.0,
            cut_tpc_cls: 89,
            bin_counting: true,
            bkg_shape: 1,
        }
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let setup = AnalysisSetup::default();
        let params = SimulationParams::default();
        let l = layout(std::path::Path::new("/tmp/x"));
        let a = generate_inputs(&setup, &cuts(), &params, &l).unwrap();
        let b = generate_inputs(&setup, &cuts(), &params, &l).unwrap();
        let key = raw_yield_key(&cuts(), Species::Matter, &setup.centrality_classes[0]);
        assert_eq!(a.signal.series(&key).unwrap(), b.signal.series(&key).unwrap());
    }

    #[test]
    fn every_input_key_is_present() {
        let setup = AnalysisSetup::default();
        let l = layout(std::path::Path::new("/tmp/x"));
        let inputs = generate_inputs(&setup, &cuts(), &SimulationParams::default(), &l).unwrap();
        for class in &setup.centrality_classes {
            for species in Species::ALL {
                assert!(inputs.signal.contains(&raw_yield_key(&cuts(), species, class)));
                assert!(inputs.efficiency.contains(&efficiency_key(species, class)));
                assert!(inputs.primary.contains(&primary_fraction_key(species, class)));
                assert!(inputs.primary.contains(&primary_curve_key(species, class)));
            }
        }
        assert_eq!(inputs.data.len(), setup.data_sources.len());
    }

    #[test]
    fn grid_reference_bin_holds_selected_events() {
        let setup = AnalysisSetup::default();
        let l = layout(std::path::Path::new("/tmp/x"));
        let inputs = generate_inputs(&setup, &cuts(), &SimulationParams::default(), &l).unwrap();
        let grid = inputs.data[0].grid(&normalization_key(&setup)).unwrap();
        let p = grid.project_y("norm", 1, 1).unwrap();
        assert!(p.content(4) > 0.0);
        assert!(p.content(4) < p.content(1));
    }

    #[test]
    fn rejects_bad_params() {
        let setup = AnalysisSetup::default();
        let l = layout(std::path::Path::new("/tmp/x"));
        let params = SimulationParams {
            events_per_percent: 0.0,
            ..SimulationParams::default()
        };
        assert_eq!(generate_inputs(&setup, &cuts(), &params, &l).unwrap_err().exit_code(), 2);
    }
}
