//! Failure taxonomy for a pipeline run.
//!
//! Every variant is terminal for the run. Value-level coercion failures are
//! not errors: they become an empty measurement instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Network error or non-2xx response from the upstream service.
    #[error("Transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Empty or malformed response body.
    #[error("Parse failure: {0}")]
    Parse(String),

    /// Registry is missing a required column.
    #[error("Schema failure in registry '{path}': {message}")]
    Schema { path: PathBuf, message: String },

    /// Registry violates its station code key.
    #[error("Duplicate station code '{code}' in registry '{path}'")]
    DuplicateStation { path: PathBuf, code: String },

    /// I/O error while serialising the report.
    #[error("Write failure for '{path}': {message}")]
    Write { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stage produced a table that does not cover the registry exactly once.
    #[error("Coverage check failed after {stage}: {message}")]
    Coverage {
        stage: &'static str,
        message: String,
    },

    #[error("No report found at '{0}', fetch data first")]
    ReportMissing(PathBuf),

    #[error("Could not read report '{path}': {message}")]
    ReportRead { path: PathBuf, message: String },
}

impl PipelineError {
    pub fn transport(message: impl Into<String>, source: Option<reqwest::Error>) -> Self {
        Self::Transport {
            message: message.into(),
            source,
        }
    }

    pub fn schema(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn report_read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::ReportRead {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
