use std::path::PathBuf;
use thiserror::Error;

use crate::subprocess::ProcessError;

/// Unified error type for the pymetra library.
///
/// Internal boundaries return `Result<T, MetricsError>` so tests can tell
/// "legitimately empty" apart from "failed and coerced to empty"; the public
/// API collapses these to the documented degraded values (booleans, `None`)
/// at the outermost layer.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Collection error: {0}")]
    Collection(String),

    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Subprocess error: {0}")]
    Subprocess(#[from] ProcessError),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MetricsError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
