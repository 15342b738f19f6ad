//! The spectra pipeline, shared by the `run` command and the integration tests.
//!
//! For every centrality class:
//! raw yield + efficiency + primary fraction -> correction -> normalization
//! (per species), then antimatter/matter ratio -> flat-line fit.
//!
//! Classes are independent; they run in parallel and a failing class or
//! species does not abort the others.

use std::path::PathBuf;

use rayon::prelude::*;

use crate::correction::{CorrectionContext, PrimaryFractionSet, PrimarySelection, correct};
use crate::domain::{CentralityClass, ClassOutput, CorrectedSpectrum, RatioOutput, Species, SpectraConfig};
use crate::error::{AppError, Result, SpectraError};
use crate::hist::EventCountGrid;
use crate::io::{
    ObjectStore, StoredObject, efficiency_key, join_key, load_event_grids, primary_curve_key,
    primary_fraction_key, ratio_name, raw_yield_key, spectrum_name, store_path,
};
use crate::normalization::{class_event_counts, normalize};
use crate::ratio::ratio;

/// Inputs of a run, loaded once and shared read-only by all classes.
#[derive(Debug)]
pub struct InputStores {
    pub signal: ObjectStore,
    pub efficiency: ObjectStore,
    pub primary: ObjectStore,
    pub event_grids: Vec<EventCountGrid>,
}

impl InputStores {
    pub fn load(config: &SpectraConfig) -> Result<Self> {
        Ok(InputStores {
            signal: ObjectStore::open(store_path(&config.out_dir, &config.signal_file))?,
            efficiency: ObjectStore::open(store_path(&config.out_dir, &config.eff_file))?,
            primary: ObjectStore::open(store_path(&config.out_dir, &config.prim_file))?,
            event_grids: load_event_grids(&config.data_dir, &config.data_file, &config.setup)?,
        })
    }
}

/// A centrality class, or one species of it, that could not be processed.
#[derive(Debug)]
pub struct ClassFailure {
    pub class: CentralityClass,
    /// `None` when the failure concerns the whole class (normalization, ratio).
    pub species: Option<Species>,
    pub error: SpectraError,
}

impl ClassFailure {
    /// `"0-5%"` or `"0-5% Matter"`.
    pub fn label(&self) -> String {
        match self.species {
            Some(species) => format!("{} {}", self.class.label(), species.display_name()),
            None => self.class.label(),
        }
    }
}

/// All computed outputs of a single `spectra run`.
#[derive(Debug)]
pub struct RunOutput {
    /// Classes with at least one spectrum, in ascending percentile order.
    pub classes: Vec<ClassOutput>,
    pub failures: Vec<ClassFailure>,
    pub output_path: Option<PathBuf>,
}

impl RunOutput {
    /// Every normalized spectrum with its species and class.
    pub fn spectra(&self) -> impl Iterator<Item = (Species, &CentralityClass, &CorrectedSpectrum)> {
        self.classes.iter().flat_map(|out| {
            Species::ALL
                .into_iter()
                .filter_map(move |species| out.spectrum(species).map(|s| (species, &out.class, s)))
        })
    }

    /// Every ratio (with its fit) with its class.
    pub fn ratios(&self) -> impl Iterator<Item = (&CentralityClass, &RatioOutput)> {
        self.classes
            .iter()
            .filter_map(|out| out.ratio.as_ref().map(|r| (&out.class, r)))
    }
}

/// Execute the full pipeline: load inputs, process every class, persist.
pub fn run_spectra(config: &SpectraConfig) -> std::result::Result<RunOutput, AppError> {
    config.setup.validate()?;
    let inputs = InputStores::load(config)?;

    let (classes, failures) = if config.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build thread pool: {e}")))?;
        pool.install(|| process_all(&inputs, config))
    } else {
        process_all(&inputs, config)
    };
    drop(inputs);

    let output_path = if classes.is_empty() {
        None
    } else {
        Some(persist(&classes, config)?)
    };

    if let Some(path) = &config.export_csv {
        crate::io::write_results_csv(path, &classes)?;
    }

    Ok(RunOutput {
        classes,
        failures,
        output_path,
    })
}

/// Process every class of the setup, isolating per-class and per-species failures.
pub fn process_all(inputs: &InputStores, config: &SpectraConfig) -> (Vec<ClassOutput>, Vec<ClassFailure>) {
    let results: Vec<(Option<ClassOutput>, Vec<ClassFailure>)> = config
        .setup
        .centrality_classes
        .par_iter()
        .enumerate()
        .map(|(index, class)| process_class(index, class, inputs, config))
        .collect();

    let mut outputs = Vec::new();
    let mut failures = Vec::new();
    for (output, class_failures) in results {
        for failure in &class_failures {
            tracing::error!(scope = %failure.label(), error = %failure.error, "processing failed");
        }
        outputs.extend(output);
        failures.extend(class_failures);
    }
    (outputs, failures)
}

/// Correct, normalize and compare both species of one class.
///
/// Each species is processed on its own: a species with missing or
/// inconsistent inputs is reported and the other one is still returned.
/// The ratio is only computed when both spectra exist.
pub fn process_class(
    index: usize,
    class: &CentralityClass,
    inputs: &InputStores,
    config: &SpectraConfig,
) -> (Option<ClassOutput>, Vec<ClassFailure>) {
    let setup = &config.setup;
    let label = class.label();
    let range = setup.pt_range_for(index);
    tracing::info!(class = %label, first_bin = range.first, last_bin = range.last, "processing centrality class");

    let failure = |species: Option<Species>, error: SpectraError| ClassFailure {
        class: class.clone(),
        species,
        error,
    };

    let counts = match class_event_counts(&inputs.event_grids, class, setup.norm_reference_bin) {
        Ok(counts) => counts,
        Err(error) => return (None, vec![failure(None, error)]),
    };
    let events: f64 = counts.iter().sum();
    if !(events.is_finite() && events > 0.0) {
        let error = SpectraError::NonPositiveNormalization {
            class: label,
            events,
        };
        return (None, vec![failure(None, error)]);
    }
    let selection = PrimarySelection::from_flag(config.sigmoid_correction, setup.primary_momentum_threshold);

    let spectrum = |species: Species| -> Result<CorrectedSpectrum> {
        let raw = inputs.signal.series(&raw_yield_key(&config.cuts, species, class))?;
        let efficiency = inputs.efficiency.series(&efficiency_key(species, class))?;
        let fitted = inputs.primary.curve(&primary_curve_key(species, class))?.clone();
        let tabulated = if selection.needs_tabulated() {
            Some(inputs.primary.series(&primary_fraction_key(species, class))?.clone())
        } else {
            None
        };
        let primary = PrimaryFractionSet { tabulated, fitted };

        let ctx = CorrectionContext {
            species,
            class_label: label.clone(),
            name: spectrum_name(species, class),
        };
        let corrected = correct(raw, efficiency, &primary, selection, range, &ctx)?;
        normalize(&corrected, &counts, config.bin_width_scaling, &label)
    };

    let mut failures = Vec::new();
    let [antimatter, matter] = Species::ALL.map(|species| match spectrum(species) {
        Ok(s) => Some(s),
        Err(error) => {
            failures.push(failure(Some(species), error));
            None
        }
    });
    if antimatter.is_none() && matter.is_none() {
        return (None, failures);
    }

    let ratio_out = match (&antimatter, &matter) {
        (Some(anti), Some(mat)) => match ratio(anti, mat, range, setup.ratio_epsilon, &ratio_name(class), &label) {
            Ok(out) => Some(out),
            Err(error) => {
                failures.push(failure(None, error));
                None
            }
        },
        _ => {
            tracing::warn!(class = %label, "ratio skipped: a species spectrum is missing");
            None
        }
    };

    let output = ClassOutput {
        class: class.clone(),
        events,
        antimatter,
        matter,
        ratio: ratio_out,
    };
    tracing::info!(
        class = %label,
        events,
        degenerate_bins = output.degenerate_count(),
        "centrality class done"
    );

    (Some(output), failures)
}

/// Write the available spectra and ratios to the output store; returns its path.
pub fn persist(outputs: &[ClassOutput], config: &SpectraConfig) -> Result<PathBuf> {
    let path = store_path(&config.out_dir, &config.out_file);
    let mut store = ObjectStore::create(&path, config.write_mode)?;
    let dir = &config.out_dir_name;

    for out in outputs {
        for spectrum in Species::ALL.into_iter().filter_map(|species| out.spectrum(species)) {
            store.insert(
                join_key(dir, spectrum.series.name()),
                StoredObject::Spectrum(spectrum.clone()),
            );
        }
        if let Some(ratio) = &out.ratio {
            store.insert(join_key(dir, ratio.series.name()), StoredObject::Ratio(ratio.clone()));
        }
    }

    store.save()?;
    Ok(path)
}
