//! Error types for the registry pipeline
//!
//! Record-level errors (`BuildError` and the errors it wraps) degrade or drop a single
//! record and never abort a run. `PipelineError` covers configuration and environment
//! failures, which abort the run before any output is published.

use std::path::PathBuf;
use thiserror::Error;

use crate::xml::XmlError;

/// Malformed registry number
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Invalid LEI '{0}': expected 18 alphanumeric characters followed by 2 check digits")]
    InvalidLei(String),
}

/// Address resolution failure for one record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Country element absent from the address block
    #[error("Address has no country code")]
    MissingCountry,

    /// Country code not present in the reference index
    #[error("Unknown country code: {0}")]
    UnknownCountry(String),
}

/// Failure to build an organization record from one block
#[derive(Error, Debug)]
pub enum BuildError {
    /// The block is not well-formed XML
    #[error("XML parse error: {0}")]
    Xml(#[from] XmlError),

    /// A required element is missing
    #[error("Missing element: {0}")]
    MissingElement(&'static str),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error("Address error for {lei}: {source}")]
    Address {
        lei: String,
        #[source]
        source: AddressError,
    },
}

/// Knowledge-base or registry-table loading failure
#[derive(Error, Debug)]
pub enum KbError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path} at line {line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate item id: {0}")]
    DuplicateItem(String),
}

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Input archive cannot be read
    #[error("Archive error in {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// IO error with path context
    #[error("IO error with {path}: {message}")]
    IoErrorWithPath {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Knowledge base or registry table could not be loaded
    #[error(transparent)]
    Kb(#[from] KbError),

    /// Output serialization error
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create an IO error with path context
    pub fn io_with_path(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::IoErrorWithPath {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ConfigError(msg) => {
                format!("Configuration error: {msg}\n\nHint: Check your pipeline configuration file.")
            }
            PipelineError::FileNotFound(path) => {
                format!(
                    "File not found: {}\n\nHint: Check that the input archives have been downloaded.",
                    path.display()
                )
            }
            PipelineError::Archive { path, message } => {
                format!(
                    "Cannot read archive {}: {message}\n\nHint: The archive may be truncated; download it again.",
                    path.display()
                )
            }
            PipelineError::Kb(err) => {
                format!("Knowledge base error: {err}\n\nHint: Rebuild the knowledge base export.")
            }
            _ => self.to_string(),
        }
    }
}
