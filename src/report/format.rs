//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::RunOutput;
use crate::domain::{FitResult, FitStatus, SpectraConfig};
use crate::io::{ObjectStore, StoredObject};

/// Format the full run summary (configuration, per-class ratio fits, failures).
pub fn format_run_summary(run: &RunOutput, config: &SpectraConfig) -> String {
    let mut out = String::new();

    out.push_str("=== spectra - corrected spectra and antimatter/matter ratios ===\n");
    out.push_str(&format!(
        "Cuts: DCAz={:.1} TPCcls={} binCounting={} bkgShape={}\n",
        config.cuts.cut_dcaz, config.cuts.cut_tpc_cls, config.cuts.bin_counting, config.cuts.bkg_shape
    ));
    out.push_str(&format!(
        "Primary fraction: {} | bin-width scaling: {}\n",
        if config.sigmoid_correction {
            "fitted curve".to_string()
        } else {
            format!("tabulated below {:.1} GeV/c", config.setup.primary_momentum_threshold)
        },
        if config.bin_width_scaling { "on" } else { "off" }
    ));

    out.push_str("\nRatio fits (constant):\n");
    out.push_str(&format!(
        "  {:<8} {:>12} {:>8} {:>22} {:>12} {:>8} {:>6}\n",
        "class", "events", "bins", "value", "chi2/ndf", "prob", "undef"
    ));
    for class_out in &run.classes {
        let (bins, fit) = match &class_out.ratio {
            Some(ratio) => (format!("{}-{}", ratio.range.first, ratio.range.last), format_fit(&ratio.fit)),
            None => ("-".to_string(), format!("{:>44}", "no ratio: missing species")),
        };
        out.push_str(&format!(
            "  {:<8} {:>12.4e} {:>8} {}  {:>6}\n",
            class_out.class.label(),
            class_out.events,
            bins,
            fit,
            class_out.degenerate_count()
        ));
    }

    if !run.failures.is_empty() {
        out.push_str("\nFailures:\n");
        for failure in &run.failures {
            out.push_str(&format!("  {:<16} {}\n", failure.label(), failure.error));
        }
    }

    if let Some(path) = &run.output_path {
        out.push_str(&format!("\nOutput: {}\n", path.display()));
    }

    out
}

fn format_fit(fit: &FitResult) -> String {
    match &fit.status {
        FitStatus::Converged => format!(
            "{:>22} {:>12} {:>8}",
            format!("{:.4} ± {:.4}", fit.value, fit.uncertainty),
            format!("{:.2}/{}", fit.chi2, fit.ndf),
            fit.probability.map(|p| format!("{p:.3}")).unwrap_or_else(|| "-".to_string()),
        ),
        FitStatus::Failed { reason } => format!("{:>44}", format!("fit failed: {reason}")),
    }
}

/// List the objects of a store, one per line.
pub fn format_store_listing(store: &ObjectStore) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} ({} objects, created {})\n",
        store.path().display(),
        store.len(),
        store.created().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for (key, object) in store.entries() {
        let detail = match object {
            StoredObject::Series(s) => format!("{} bins", s.n_bins()),
            StoredObject::Curve(c) => c.kind_name().to_string(),
            StoredObject::Grid(g) => format!("{}x{} bins", g.n_x(), g.n_y()),
            StoredObject::Spectrum(s) => format!(
                "{}, bins {}-{}, {} undefined",
                s.species, s.range.first, s.range.last, s.degenerate.len()
            ),
            StoredObject::Ratio(r) => match &r.fit.status {
                FitStatus::Converged => format!("fit {:.4} ± {:.4}", r.fit.value, r.fit.uncertainty),
                FitStatus::Failed { .. } => "fit failed".to_string(),
            },
        };
        out.push_str(&format!("  {:<10} {key}  [{detail}]\n", object.kind_name()));
    }
    out
}
