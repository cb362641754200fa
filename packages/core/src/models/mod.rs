//! Data Models
//!
//! This module contains the data structures shared by the engine, the
//! database layer and the HTTP surface:
//!
//! - `Section` - Flat persisted outline entry
//! - `SectionTree` - Nested presentation shape
//! - `AnchorPosition` / `DeleteStrategy` - Mutation parameters

mod section;

pub use section::{
    AnchorPosition, CreateSectionParams, DeleteOutcome, DeleteStrategy, Section, SectionTree,
    MAX_SECTION_DEPTH,
};
