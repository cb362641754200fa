//! Business Services
//!
//! This module contains the section tree logic:
//!
//! - `SectionService` - Rename, create, delete and move, plus tree reads
//! - `import` - Bulk import of flat JSON templates
//! - `TreeAssembler` - Flat rows to nested trees and back
//!
//! Services coordinate between the database layer and callers, enforcing
//! the tree invariants inside one transaction per operation.

pub mod error;
pub mod import;
pub mod section_service;
pub mod tree_assembler;

pub use error::SectionServiceError;
pub use import::{ImportMode, ImportOptions, ImportReport};
pub use section_service::SectionService;
pub use tree_assembler::TreeAssembler;
