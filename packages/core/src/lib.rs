//! TOC Core Business Logic Layer
//!
//! This crate provides the persisted, ordered section tree behind the
//! table-of-contents service: data model, ordering arithmetic, the mutation
//! engine, bulk import and tree assembly.
//!
//! # Architecture
//!
//! - **Flat storage**: sections live in one table keyed by `id` with a
//!   `parent_id` back-reference; nested views are built on read
//! - **Contiguous ordering**: every mutation renumbers the sibling groups it
//!   touches to `1..=N`
//! - **libsql**: embedded SQLite-compatible database, one `BEGIN IMMEDIATE`
//!   transaction per mutation
//!
//! # Modules
//!
//! - [`models`] - Data structures (Section, SectionTree, request types)
//! - [`services`] - Mutation engine, import and tree assembly
//! - [`db`] - Database layer with libsql integration

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseError, DatabaseService};
pub use models::*;
pub use services::*;
