//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - Write transaction boundaries (`BEGIN IMMEDIATE` / `COMMIT` / `ROLLBACK`)
//! - Tree accessor reads and row writes for the section table
//! - Pure sibling-order arithmetic shared by every mutation
//!
//! # Architecture
//!
//! The store is a flat `document_section` table keyed by `id` with a
//! `parent_id` back-reference. Nested views are reconstructed on read by the
//! tree assembler and are never persisted.

mod database;
mod error;
pub mod section_store;
pub mod sibling_ordering;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use section_store::SectionStore;
pub use sibling_ordering::SiblingOrderCalculator;
