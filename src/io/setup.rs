//! Analysis setup overrides loaded from JSON.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::AnalysisSetup;
use crate::error::{Result, SpectraError};

/// Read and validate an `AnalysisSetup`; absent fields keep their defaults.
pub fn load_setup(path: &Path) -> Result<AnalysisSetup> {
    let file = File::open(path).map_err(|source| SpectraError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let setup: AnalysisSetup = serde_json::from_reader(BufReader::new(file)).map_err(|source| SpectraError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    setup.validate()?;
    Ok(setup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_setup_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.json");
        std::fs::write(&path, r#"{ "data_sources": ["LHC18q"], "ratio_epsilon": 1e-8 }"#).unwrap();

        let setup = load_setup(&path).unwrap();
        assert_eq!(setup.data_sources, vec!["LHC18q".to_string()]);
        assert_eq!(setup.ratio_epsilon, 1e-8);
        assert_eq!(setup.centrality_classes.len(), 5);
        assert_eq!(setup.norm_reference_bin, 4);
    }

    #[test]
    fn invalid_setup_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.json");
        std::fs::write(&path, r#"{ "centrality_classes": [] }"#).unwrap();
        assert!(matches!(load_setup(&path), Err(SpectraError::InvalidSetup(_))));
    }
}
