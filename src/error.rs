//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the analysis of one sample.
///
/// Ambiguous taxonomy and malformed rows are not represented here: they
/// resolve to sentinel values or are skipped where they are read.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Required input not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("Could not launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed (exit code: {code:?}): {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Result store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Reads a whole text file, mapping "not found" to [`PipelineError::MissingInput`].
pub fn read_input<P: Into<PathBuf>>(path: P) -> Result<String> {
    let path = path.into();
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PipelineError::MissingInput { path })
        }
        Err(e) => Err(PipelineError::Io(e)),
    }
}
