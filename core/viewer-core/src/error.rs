//! Error types for viewer-core operations.
//!
//! The path decoder and the transcript reconstructor are total and never
//! produce these; they are reserved for the orchestration helpers
//! (configuration, deletion, search arguments).

use std::path::PathBuf;

/// All errors that can occur in viewer-core operations.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Project / Session Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(PathBuf),

    #[error("Invalid session path: {path}: {reason}")]
    InvalidSessionPath { path: PathBuf, reason: String },

    #[error("Query must be at least {min} characters")]
    QueryTooShort { min: usize },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ViewerError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ViewerError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using ViewerError.
pub type Result<T> = std::result::Result<T, ViewerError>;

// Conversion for string error compatibility
impl From<ViewerError> for String {
    fn from(err: ViewerError) -> String {
        err.to_string()
    }
}
