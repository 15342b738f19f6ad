//! Export per-bin results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per in-range bin of every available spectrum and ratio.
//! Objects missing from a class (failed species, skipped ratio) have no rows.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::ClassOutput;
use crate::error::AppError;
use crate::hist::BinnedSeries;

/// Write every spectrum and ratio bin to a CSV file.
pub fn write_results_csv(path: &Path, outputs: &[ClassOutput]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut file = BufWriter::new(file);

    writeln!(file, "centrality_low,centrality_high,object,bin,pt_low,pt_high,value,error")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for out in outputs {
        let rows = [
            ("antimatter", out.antimatter.as_ref().map(|s| (&s.series, s.range))),
            ("matter", out.matter.as_ref().map(|s| (&s.series, s.range))),
            ("ratio", out.ratio.as_ref().map(|r| (&r.series, r.range))),
        ];
        for (object, row) in rows {
            let Some((series, range)) = row else {
                continue;
            };
            for i in range.iter() {
                write_row(&mut file, out.class.low, out.class.high, object, series, i)?;
            }
        }
    }

    file.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

fn write_row(
    file: &mut impl Write,
    low: f64,
    high: f64,
    object: &str,
    series: &BinnedSeries,
    i: usize,
) -> Result<(), AppError> {
    writeln!(
        file,
        "{low:.0},{high:.0},{object},{i},{:.3},{:.3},{},{}",
        series.low_edge(i),
        series.up_edge(i),
        fmt_value(series.content(i)),
        fmt_value(series.error(i)),
    )
    .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))
}

/// Undefined values are written as empty cells.
fn fmt_value(v: f64) -> String {
    if v.is_finite() { format!("{v:.6e}") } else { String::new() }
}
