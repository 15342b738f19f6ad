//! File-backed keyed object store.
//!
//! A store is one JSON document holding named objects. Names may contain
//! `/` to group objects in directories, mirroring how the inputs were
//! organised by the upstream extraction steps:
//!
//! ```text
//! 1.0_89_1_1/fATPCrawYield_0_5   -> series
//! fASigmoidFit_0_5               -> curve
//! mpuccio_he3_/fNormalisationHist -> grid
//! ```
//!
//! Writes go to a temporary sibling file which is then renamed over the
//! target, so a failed run never leaves a truncated store behind.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CorrectedSpectrum, RatioOutput, WriteMode};
use crate::error::{Result, SpectraError};
use crate::hist::{BinnedSeries, EventCountGrid};
use crate::models::CurveFunction;

/// Any object that can live in a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoredObject {
    Series(BinnedSeries),
    Curve(CurveFunction),
    Grid(EventCountGrid),
    Spectrum(CorrectedSpectrum),
    Ratio(RatioOutput),
}

impl StoredObject {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StoredObject::Series(_) => "series",
            StoredObject::Curve(_) => "curve",
            StoredObject::Grid(_) => "grid",
            StoredObject::Spectrum(_) => "spectrum",
            StoredObject::Ratio(_) => "ratio",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    objects: BTreeMap<String, StoredObject>,
}

/// An object store loaded in memory.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    path: PathBuf,
    file: StoreFile,
}

/// Join a directory and an object name; `""` and `"."` mean the top level.
pub fn join_key(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

macro_rules! typed_getter {
    ($fn_name:ident, $variant:ident, $ty:ty, $label:literal) => {
        #[doc = concat!("Fetch a ", $label, " by key.")]
        pub fn $fn_name(&self, key: &str) -> Result<&$ty> {
            match self.get(key)? {
                StoredObject::$variant(inner) => Ok(inner),
                other => Err(self.wrong_kind(key, $label, other)),
            }
        }
    };
}

impl ObjectStore {
    /// An empty store that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        ObjectStore {
            path: path.into(),
            file: StoreFile {
                created: now,
                updated: now,
                objects: BTreeMap::new(),
            },
        }
    }

    /// Load an existing store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SpectraError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: StoreFile =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| SpectraError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), objects = file.objects.len(), "store loaded");
        Ok(ObjectStore {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Open a store for writing according to `mode`.
    pub fn create(path: impl AsRef<Path>, mode: WriteMode) -> Result<Self> {
        let path = path.as_ref();
        match mode {
            WriteMode::Update if path.exists() => Self::open(path),
            _ => Ok(Self::empty(path)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.file.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.objects.is_empty()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.file.created
    }

    /// All keys with their object kind, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &StoredObject)> {
        self.file.objects.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.file.objects.contains_key(key)
    }

    /// Fetch any object; [`SpectraError::MissingInput`] when absent.
    pub fn get(&self, key: &str) -> Result<&StoredObject> {
        self.file.objects.get(key).ok_or_else(|| SpectraError::MissingInput {
            store: self.path.display().to_string(),
            key: key.to_string(),
        })
    }

    typed_getter!(series, Series, BinnedSeries, "series");
    typed_getter!(curve, Curve, CurveFunction, "curve");
    typed_getter!(grid, Grid, EventCountGrid, "grid");
    typed_getter!(spectrum, Spectrum, CorrectedSpectrum, "spectrum");
    typed_getter!(ratio, Ratio, RatioOutput, "ratio");

    /// Insert or replace an object.
    pub fn insert(&mut self, key: impl Into<String>, object: StoredObject) {
        self.file.objects.insert(key.into(), object);
    }

    /// Persist the store to its path.
    pub fn save(&mut self) -> Result<()> {
        self.file.updated = Utc::now();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SpectraError::Io { path, source }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(io_err(&tmp))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.file).map_err(|source| SpectraError::Json {
            path: tmp.clone(),
            source,
        })?;
        writer.flush().map_err(io_err(&tmp))?;
        drop(writer);

        std::fs::rename(&tmp, &self.path).map_err(io_err(&self.path))?;
        tracing::info!(path = %self.path.display(), objects = self.file.objects.len(), "store written");
        Ok(())
    }

    fn wrong_kind(&self, key: &str, expected: &'static str, found: &StoredObject) -> SpectraError {
        SpectraError::WrongKind {
            store: self.path.display().to_string(),
            key: key.to_string(),
            expected,
            found: found.kind_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> BinnedSeries {
        let mut s = BinnedSeries::uniform("fAEff_TPC_0_5", 4, 0.0, 4.0).unwrap();
        s.set(2, 0.6, 0.01);
        s
    }

    #[test]
    fn keys_join_directories() {
        assert_eq!(join_key(".", "fRatio_0_5"), "fRatio_0_5");
        assert_eq!(join_key("", "fRatio_0_5"), "fRatio_0_5");
        assert_eq!(join_key("1.0_89_1_1/", "x"), "1.0_89_1_1/x");
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("EfficiencyHe3.json");

        let mut store = ObjectStore::empty(&path);
        store.insert("fAEff_TPC_0_5", StoredObject::Series(sample_series()));
        store.insert(
            "fASigmoidFit_0_5",
            StoredObject::Curve(CurveFunction::Sigmoid {
                amplitude: 1.0,
                slope: 1.0,
                midpoint: 1.0,
            }),
        );
        store.save().unwrap();

        let back = ObjectStore::open(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.series("fAEff_TPC_0_5").unwrap(), &sample_series());
        assert_eq!(back.curve("fASigmoidFit_0_5").unwrap().kind_name(), "sigmoid");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn undefined_diagnostics_survive_reload() {
        use crate::domain::{BinRange, CorrectedSpectrum, DegenerateBin, Species};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SpectraHe3.json");

        let mut series = sample_series();
        series.set(3, f64::NAN, f64::NAN);
        let spectrum = CorrectedSpectrum {
            species: Species::Antimatter,
            series,
            range: BinRange { first: 1, last: 4 },
            degenerate: vec![DegenerateBin {
                bin: 3,
                momentum: 2.5,
                raw_yield: f64::NAN,
                efficiency: 0.0,
            }],
        };
        let mut store = ObjectStore::empty(&path);
        store.insert("fASpectra_0_5", StoredObject::Spectrum(spectrum));
        store.save().unwrap();

        let back = ObjectStore::open(&path).unwrap();
        let spectrum = back.spectrum("fASpectra_0_5").unwrap();
        assert!(spectrum.series.content(3).is_nan());
        assert_eq!(spectrum.degenerate.len(), 1);
        assert!(spectrum.degenerate[0].raw_yield.is_nan());
        assert_eq!(spectrum.degenerate[0].efficiency, 0.0);
    }

    #[test]
    fn missing_and_wrong_kind_are_distinguished() {
        let mut store = ObjectStore::empty("mem.json");
        store.insert("a", StoredObject::Series(sample_series()));
        assert!(matches!(store.series("b"), Err(SpectraError::MissingInput { .. })));
        assert!(matches!(
            store.curve("a"),
            Err(SpectraError::WrongKind { expected: "curve", found: "series", .. })
        ));
    }

    #[test]
    fn update_mode_keeps_existing_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SpectraHe3.json");

        let mut first = ObjectStore::create(&path, WriteMode::Recreate).unwrap();
        first.insert("old", StoredObject::Series(sample_series()));
        first.save().unwrap();

        let updated = ObjectStore::create(&path, WriteMode::Update).unwrap();
        assert!(updated.contains("old"));
        let recreated = ObjectStore::create(&path, WriteMode::Recreate).unwrap();
        assert!(recreated.is_empty());
    }

    #[test]
    fn open_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ObjectStore::open(dir.path().join("nope.json")),
            Err(SpectraError::Io { .. })
        ));
    }
}
