//! Service Layer Error Types
//!
//! This module defines the error taxonomy surfaced by every section
//! operation. Callers map the variants to transport status codes.

use crate::db::DatabaseError;
use thiserror::Error;

/// Section operation errors
///
/// - `Validation`: rejected before any write (empty name, bad import record,
///   duplicate import key, cyclic parent reference)
/// - `NotFound`: an id, anchor, parent or target does not exist
/// - `Conflict`: the request contradicts the tree structure (self move,
///   cross-parent move, anchor/parent disagreement)
/// - `Database`: the store failed; the transaction was rolled back
#[derive(Error, Debug)]
pub enum SectionServiceError {
    /// Input failed validation
    #[error("{0}")]
    Validation(String),

    /// Referenced section does not exist
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Structural conflict
    #[error("{0}")]
    Conflict(String),

    /// Import source could not be read
    #[error("Template file not found: {path}")]
    SourceNotFound { path: String },

    /// Import source exists but reading it failed
    #[error("Failed to read template file {path}: {source}")]
    SourceUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),
}

impl SectionServiceError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a section not found error
    pub fn section_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            what: "Section",
            id: id.into(),
        }
    }

    /// Create a not found error for a section in a named role (parent, anchor, target)
    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a missing import source error
    pub fn source_not_found(path: impl Into<String>) -> Self {
        Self::SourceNotFound { path: path.into() }
    }

    /// Whether the error means the caller asked for something that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::SourceNotFound { .. })
    }
}
