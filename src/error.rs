use std::path::PathBuf;

use thiserror::Error;

use crate::diff::DiffError;

pub type PiResult<T> = Result<T, PiError>;

#[derive(Debug, Error)]
pub enum PiError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("File {0:?} does not exist")]
    MissingInput(PathBuf),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("diff failure: {0}")]
    Diff(#[from] DiffError),
}

impl PiError {
    /// Wraps a SQLite error with the import step that produced it.
    #[must_use]
    pub fn storage(step: &str, error: impl std::fmt::Display) -> Self {
        Self::Storage(format!("{step}: {error}"))
    }

    /// Stable, machine-readable error code for every variant.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "PI-IO",
            Self::Json(_) => "PI-JSON",
            Self::Storage(_) => "PI-STORAGE",
            Self::MissingInput(_) => "PI-MISSING-INPUT",
            Self::InvalidRequest(_) => "PI-INVALID-REQUEST",
            Self::Diff(_) => "PI-DIFF",
        }
    }
}

impl From<rusqlite::Error> for PiError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}
