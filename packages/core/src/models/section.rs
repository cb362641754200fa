//! Section Data Structures
//!
//! A section is one entry of the persisted table of contents. The store keeps
//! sections as a flat table keyed by `id` with a `parent_id` back-reference;
//! the nested [`SectionTree`] shape only exists for presentation.
//!
//! # Examples
//!
//! ```rust
//! use toc_core::models::{AnchorPosition, DeleteStrategy};
//!
//! assert_eq!("before".parse::<AnchorPosition>().unwrap(), AnchorPosition::Before);
//! assert_eq!(DeleteStrategy::default(), DeleteStrategy::LiftChildren);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Deepest nesting an outline may reach; roots sit at depth 1
///
/// Creation and import both refuse to go past it, so every stored tree can be
/// assembled and flattened without exhausting the stack.
pub const MAX_SECTION_DEPTH: usize = 64;

/// A single outline entry as persisted.
///
/// # Fields
///
/// - `id`: Stable identifier assigned at creation (UUID v4), never changes
/// - `parent_id`: Parent section, `None` for roots
/// - `section_key`: Advisory label supplied by the user or the importer
/// - `name`: Display text
/// - `order`: Position within the sibling group, contiguous from 1
/// - `is_leaf`: Derived on read, true when no section references this one as parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub parent_id: Option<String>,
    pub section_key: String,
    pub name: String,
    pub order: i64,
    pub is_leaf: bool,
}

impl Section {
    /// Generate a fresh section id
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate the advisory key used for sections created interactively
    pub fn generate_key() -> String {
        format!("new-{}", Uuid::new_v4())
    }
}

/// Nested view of a section and its ordered children.
///
/// Produced by the tree assembler for `GET /sections`; never used as the
/// source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTree {
    pub id: String,
    pub parent_id: Option<String>,
    pub section_key: String,
    pub name: String,
    pub is_leaf: bool,
    pub order: i64,
    #[serde(default)]
    pub children: Vec<SectionTree>,
}

impl SectionTree {
    /// Build a childless tree node from a flat section
    pub fn from_section(section: Section) -> Self {
        Self {
            id: section.id,
            parent_id: section.parent_id,
            section_key: section.section_key,
            name: section.name,
            is_leaf: true,
            order: section.order,
            children: Vec::new(),
        }
    }

    /// Flat section for this node (children are not included)
    pub fn to_section(&self) -> Section {
        Section {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            section_key: self.section_key.clone(),
            name: self.name.clone(),
            order: self.order,
            is_leaf: self.children.is_empty(),
        }
    }

    /// Number of sections in this subtree, including the root
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(SectionTree::size).sum::<usize>()
    }
}

/// Placement relative to an anchor section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPosition {
    Before,
    After,
}

impl fmt::Display for AnchorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorPosition::Before => write!(f, "before"),
            AnchorPosition::After => write!(f, "after"),
        }
    }
}

impl FromStr for AnchorPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(AnchorPosition::Before),
            "after" => Ok(AnchorPosition::After),
            other => Err(format!(
                "invalid position '{}', expected 'before' or 'after'",
                other
            )),
        }
    }
}

/// What happens to the children of a deleted section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStrategy {
    /// Remove the section and its entire subtree
    Cascade,
    /// Reattach direct children to the deleted section's parent, in its slot
    #[default]
    LiftChildren,
}

impl fmt::Display for DeleteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteStrategy::Cascade => write!(f, "cascade"),
            DeleteStrategy::LiftChildren => write!(f, "lift_children"),
        }
    }
}

impl FromStr for DeleteStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cascade" => Ok(DeleteStrategy::Cascade),
            "lift_children" => Ok(DeleteStrategy::LiftChildren),
            other => Err(format!(
                "invalid strategy '{}', expected 'lift_children' or 'cascade'",
                other
            )),
        }
    }
}

/// Parameters for creating a section
///
/// When `anchor_id` is set the anchor's parent is authoritative; `parent_id`
/// may be omitted or must name the same parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSectionParams {
    pub name: String,
    pub parent_id: Option<String>,
    pub anchor_id: Option<String>,
    pub anchor_position: Option<AnchorPosition>,
}

impl CreateSectionParams {
    /// Append `name` as the last child of `parent_id` (or as the last root)
    pub fn append(name: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent_id: parent_id.map(str::to_string),
            ..Default::default()
        }
    }

    /// Insert `name` next to `anchor_id`
    pub fn anchored(
        name: impl Into<String>,
        anchor_id: impl Into<String>,
        position: AnchorPosition,
    ) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
            anchor_id: Some(anchor_id.into()),
            anchor_position: Some(position),
        }
    }
}

/// Ids touched by a delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Sections physically removed
    pub deleted_ids: Vec<String>,
    /// Children reattached to the deleted section's parent (lift_children only)
    pub lifted_ids: Vec<String>,
}
