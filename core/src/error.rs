//! Typed error taxonomy shared by all LexiShift crates.
//!
//! Loaders and stores fail fast with one of these variants; the helper
//! facade catches them, records `last_error` in the status file and returns
//! a structured failure payload to the caller.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A required resource path is absent or unreadable (JMDict, FreeDict
    /// TEI, frequency DB, stopwords file).
    #[error("missing input: {path}")]
    InputMissing { path: PathBuf },

    /// A resource exists but failed to parse or has the wrong shape.
    #[error("malformed input {path}: {detail}")]
    InputMalformed { path: PathBuf, detail: String },

    /// The language pair has no rulegen adapter or lacks a capability flag
    /// needed by the requested job.
    #[error("unsupported language pair: {0}")]
    PairUnsupported(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn missing<P: Into<PathBuf>>(path: P) -> Self {
        CoreError::InputMissing { path: path.into() }
    }

    pub fn malformed<P: Into<PathBuf>, D: Into<String>>(path: P, detail: D) -> Self {
        CoreError::InputMalformed {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Machine-readable code used in wire replies and the status file.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InputMissing { .. } => "input_missing",
            CoreError::InputMalformed { .. } => "input_malformed",
            CoreError::PairUnsupported(_) => "pair_unsupported",
            CoreError::Io(_) => "io_error",
            CoreError::Sqlite(_) => "io_error",
            CoreError::Json(_) => "input_malformed",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
