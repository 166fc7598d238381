//! Rule-generation error type.

use lexishift_core::CoreError;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulegenError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("xml error in {path}: {source}")]
    Xml {
        path: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RulegenError {
    pub fn xml<P: AsRef<Path>>(path: P, source: quick_xml::Error) -> Self {
        RulegenError::Xml {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Stable machine code for wire replies.
    pub fn code(&self) -> &'static str {
        match self {
            RulegenError::Core(e) => e.code(),
            RulegenError::Xml { .. } => "input_malformed",
            RulegenError::Io(_) => "io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, RulegenError>;
