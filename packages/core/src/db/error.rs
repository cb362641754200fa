//! Store errors
//!
//! Everything the libsql layer can report: opening the file, preparing the
//! schema, running a statement, and the transaction boundaries around a
//! mutation. Tree rule violations never surface here.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The database file could not be opened or created
    #[error("Cannot open section database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: libsql::Error,
    },

    /// The directory holding the database file could not be created
    #[error("Cannot create database directory for {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema setup failed: {0}")]
    Schema(String),

    /// Row or cursor error raised by libsql outside a described statement
    #[error(transparent)]
    Libsql(#[from] libsql::Error),

    /// A statement failed; the message names the statement
    #[error("Query failed: {0}")]
    Query(String),

    /// `BEGIN IMMEDIATE`, `COMMIT` or `ROLLBACK` failed
    #[error("Transaction failed: {0}")]
    Transaction(String),
}

impl DatabaseError {
    pub fn open(path: PathBuf, source: libsql::Error) -> Self {
        Self::Open { path, source }
    }

    pub fn create_directory(path: PathBuf, source: std::io::Error) -> Self {
        Self::CreateDirectory { path, source }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }
}
