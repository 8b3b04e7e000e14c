//! Crate-wide error type.
//!
//! Store lookups that simply miss return `Option`/`bool`; everything in
//! here is a failure the caller has to act on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsdeskError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config file error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} responded with HTTP {status}")]
    HttpStatus {
        source_name: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("region {selector} not found in {file}")]
    RegionNotFound { selector: String, file: String },

    #[error("invalid region selector {0:?} (expected #id or .class)")]
    InvalidSelector(String),

    #[error("unresolved placeholder left in rendered page: {0}")]
    UnresolvedPlaceholder(String),

    #[error("a topic named {0:?} already exists")]
    DuplicateTopic(String),

    #[error("a page with filename {0:?} already exists")]
    DuplicatePage(String),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("invalid name {0:?}: must be a plain file name")]
    InvalidName(String),

    #[error("invalid status {0:?}")]
    InvalidStatus(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NewsdeskError>;

impl NewsdeskError {
    /// Wrap an `std::io::Error` together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NewsdeskError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        NewsdeskError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}
