//! Database Connection Management
//!
//! This module provides the database connection, schema initialization and
//! transaction boundaries for the section table using libsql.
//!
//! # Architecture
//!
//! - **Flat table**: `document_section` keyed by `id` with a `parent_id` back-reference
//! - **Derived leaf flag**: `is_leaf` is computed on read, never stored
//! - **WAL mode**: Readers never block on an in-flight writer
//! - **Foreign keys**: Enabled on every connection for referential integrity
//!
//! # Write transactions
//!
//! Every mutation runs inside `BEGIN IMMEDIATE`, which takes SQLite's write
//! lock before the first read. Two renumberings of the same sibling group can
//! therefore never interleave; the second waits on the busy timeout.
//!
//! ```no_run
//! # use toc_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseService::new(PathBuf::from("./data/toc.db")).await?;
//! let conn = db.begin_write().await?;
//! // ... reads and writes through `conn` ...
//! db.finish_write(&conn, Ok::<(), toc_core::db::DatabaseError>(())).await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Busy timeout applied to every connection, in milliseconds
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database service for managing the libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Open (or create) the database at `db_path` and initialize the schema
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Enable WAL mode and foreign keys
    /// 4. Create the section table and its index (idempotent)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created, the
    /// connection fails, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::create_directory(db_path.clone(), e))?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::open(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;

        tracing::debug!("Database ready at {}", service.db_path.display());
        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements may return rows, so they go through query() instead
    /// of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::query(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::query(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Create the section table and index
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS document_section (
                id TEXT PRIMARY KEY,
                parent_id TEXT REFERENCES document_section(id),
                section_key TEXT NOT NULL,
                name TEXT NOT NULL,
                "order" INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )"#,
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::schema(format!(
                "Failed to create document_section table: {}",
                e
            ))
        })?;

        conn.execute(
            r#"CREATE INDEX IF NOT EXISTS idx_document_section_parent_order
               ON document_section(parent_id, "order")"#,
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::schema(format!(
                "Failed to create parent/order index: {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Get a raw connection to the database
    ///
    /// Prefer `connect_with_timeout()`; a raw connection has neither the busy
    /// timeout nor foreign keys enabled.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::Libsql)
    }

    /// Get a connection with busy timeout and foreign keys configured
    ///
    /// Concurrent writers wait up to the busy timeout instead of failing
    /// immediately with `SQLITE_BUSY`.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, &format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    /// Open a connection and start an immediate write transaction on it
    pub async fn begin_write(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::transaction(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(conn)
    }

    /// Commit on `Ok`, roll back on `Err`, and hand the result back
    ///
    /// A failed commit is rolled back and reported as a `DatabaseError`
    /// converted into the caller's error type.
    pub async fn finish_write<T, E>(
        &self,
        conn: &libsql::Connection,
        result: Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        match result {
            Ok(value) => {
                if let Err(e) = conn.execute("COMMIT", ()).await {
                    if let Err(rollback_err) = conn.execute("ROLLBACK", ()).await {
                        tracing::warn!(
                            "Rollback after failed commit also failed: {}",
                            rollback_err
                        );
                    }
                    return Err(DatabaseError::transaction(format!(
                        "Failed to commit transaction: {}",
                        e
                    ))
                    .into());
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = conn.execute("ROLLBACK", ()).await {
                    tracing::warn!("Failed to roll back transaction: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}
