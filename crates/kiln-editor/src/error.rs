//! Error taxonomy for editor operations.
//!
//! Every fallible operation returns [`Result`]. The dispatcher turns errors
//! into status-line text at the operation boundary, so the `Display` strings
//! here are what the user reads.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while talking to an external program.
#[derive(Debug, Error)]
pub enum ExternalToolError {
    #[error("Executable not found: {0}")]
    NotFound(String),

    #[error("Command timed out")]
    Timeout,

    #[error("Error: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum EditorError {
    /// Open / save failure. Buffer and cursor are left untouched.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Bytes were not valid in the detected encoding. Loading continues
    /// with replacement characters; this is reported, not fatal.
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    ExternalTool(#[from] ExternalToolError),

    #[error("Line {row} out of range (document has {count} lines)")]
    OutOfRange { row: usize, count: usize },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

impl EditorError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;
