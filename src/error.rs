//! Error types.
//!
//! Two layers:
//!
//! - [`SpectraError`]: what the library operations return (missing objects,
//!   inconsistent binning, bad normalization, I/O)
//! - [`AppError`]: what the binary reports, an exit code plus a message

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the correction pipeline and its I/O collaborators.
#[derive(Debug, Error)]
pub enum SpectraError {
    /// A named object is absent from a store.
    #[error("missing input '{key}' in {store}")]
    MissingInput { store: String, key: String },

    /// A named object exists but has the wrong kind.
    #[error("object '{key}' in {store} is a {found}, expected a {expected}")]
    WrongKind {
        store: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The summed event count for a centrality class is not positive.
    #[error("non-positive event count {events} for centrality class {class}")]
    NonPositiveNormalization { class: String, events: f64 },

    /// Two series that must share an axis do not.
    #[error("binning mismatch for {what}: expected {expected}, found {found}")]
    BinningMismatch {
        what: String,
        expected: String,
        found: String,
    },

    /// A requested bin range does not fit in the series.
    #[error("invalid bin range [{first}, {last}] for a series with {n_bins} bins")]
    InvalidRange {
        first: usize,
        last: usize,
        n_bins: usize,
    },

    /// The analysis setup is inconsistent.
    #[error("invalid analysis setup: {0}")]
    InvalidSetup(String),

    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SpectraError {
    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            SpectraError::NonPositiveNormalization { .. } => 4,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpectraError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<SpectraError> for AppError {
    fn from(err: SpectraError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
