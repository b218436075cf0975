//! Typed errors for the two pipeline stages.
//!
//! Orchestration code wraps these in `anyhow` with file and stage context;
//! the variants here describe what went wrong with the data or destination.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning a raw customer file into a bronze file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("raw file {0:?} not found")]
    RawFileNotFound(PathBuf),

    #[error("required column '{0}' not found after header standardization")]
    MissingColumn(&'static str),

    #[error("columns '{first}' and '{second}' both map to '{canonical}'")]
    DuplicateColumn {
        canonical: &'static str,
        first: String,
        second: String,
    },
}

/// Errors raised while loading a bronze file into the destination.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("bronze data has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("row {row}: age '{value}' cannot be stored as an integer")]
    AgeNotCastable { row: usize, value: String },

    #[error("'{0}' is not a valid SQL identifier")]
    InvalidIdentifier(String),

    #[error("failed to connect to {target}")]
    Connection {
        target: String,
        #[source]
        source: postgres::Error,
    },

    #[error("failed to provision {0}")]
    Provision(String, #[source] postgres::Error),

    #[error("failed to insert row {row}")]
    Insert {
        row: usize,
        #[source]
        source: postgres::Error,
    },

    #[error("failed to commit load")]
    Commit(#[source] postgres::Error),

    #[error("failed to close connection")]
    Close(#[source] postgres::Error),

    #[error("destination error: {0}")]
    Destination(String),
}
