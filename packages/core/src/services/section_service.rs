//! Section Service - Mutation Engine
//!
//! Implements rename, create, delete and move over the flat section table.
//! Every mutation:
//!
//! 1. Validates its input before touching the store
//! 2. Opens one `BEGIN IMMEDIATE` transaction
//! 3. Reads the affected sibling group(s) through [`SectionStore`]
//! 4. Computes the new sequence with [`SiblingOrderCalculator`]
//! 5. Writes only the rows that changed, then commits (or rolls back on error)
//!
//! After every committed mutation each touched sibling group is numbered
//! `1..=N` with no gaps.

use crate::db::{DatabaseService, SectionStore, SiblingOrderCalculator};
use crate::models::{
    AnchorPosition, CreateSectionParams, DeleteOutcome, DeleteStrategy, Section, SectionTree,
    MAX_SECTION_DEPTH,
};
use crate::services::error::SectionServiceError;
use crate::services::tree_assembler::TreeAssembler;
use libsql::Connection;
use std::sync::Arc;

/// Trim a user-supplied name, rejecting empty results
pub(crate) fn normalize_name(raw: &str) -> Result<String, SectionServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SectionServiceError::validation("name must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn ids_of(sections: &[Section]) -> Vec<String> {
    sections.iter().map(|s| s.id.clone()).collect()
}

/// Mutation engine and read entry point for the section tree
#[derive(Debug, Clone)]
pub struct SectionService {
    db: Arc<DatabaseService>,
}

impl SectionService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Underlying database service
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    //
    // READS
    //

    /// Fetch a single section
    pub async fn get_section(&self, id: &str) -> Result<Section, SectionServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        SectionStore::new(&conn)
            .get_section(id)
            .await?
            .ok_or_else(|| SectionServiceError::section_not_found(id))
    }

    /// All sections, flat, grouped by parent and ascending by order
    pub async fn list_sections(&self) -> Result<Vec<Section>, SectionServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        Ok(SectionStore::new(&conn).list_sections().await?)
    }

    /// The whole outline as nested trees
    pub async fn get_tree(&self) -> Result<Vec<SectionTree>, SectionServiceError> {
        let sections = self.list_sections().await?;
        Ok(TreeAssembler::assemble(sections))
    }

    /// The nested subtree rooted at `id`
    pub async fn get_subtree(&self, id: &str) -> Result<SectionTree, SectionServiceError> {
        fn find(trees: Vec<SectionTree>, id: &str) -> Option<SectionTree> {
            for tree in trees {
                if tree.id == id {
                    return Some(tree);
                }
                if let Some(found) = find(tree.children, id) {
                    return Some(found);
                }
            }
            None
        }

        find(self.get_tree().await?, id).ok_or_else(|| SectionServiceError::section_not_found(id))
    }

    //
    // MUTATIONS
    //

    /// Rename a section
    ///
    /// Only `name` changes. Renaming to the current name is a successful no-op.
    pub async fn rename_section(
        &self,
        id: &str,
        new_name: &str,
    ) -> Result<Section, SectionServiceError> {
        let name = normalize_name(new_name)?;

        let conn = self.db.begin_write().await?;
        let result = Self::rename_in_tx(&conn, id, name).await;
        let (section, changed) = self.db.finish_write(&conn, result).await?;

        if changed {
            tracing::info!("Renamed section {} to '{}'", section.id, section.name);
        } else {
            tracing::debug!("Rename of section {} was a no-op", section.id);
        }
        Ok(section)
    }

    async fn rename_in_tx(
        conn: &Connection,
        id: &str,
        name: String,
    ) -> Result<(Section, bool), SectionServiceError> {
        let store = SectionStore::new(conn);
        let mut section = store
            .get_section(id)
            .await?
            .ok_or_else(|| SectionServiceError::section_not_found(id))?;

        if section.name == name {
            return Ok((section, false));
        }

        store.update_name(id, &name).await?;
        section.name = name;
        Ok((section, true))
    }

    /// Create a section and return its id
    ///
    /// With an anchor the new section goes immediately before/after it among
    /// the anchor's siblings (default `after`); otherwise it is appended as the
    /// last child of `parent_id`, or as the last root when `parent_id` is `None`.
    /// A section that would sit deeper than [`MAX_SECTION_DEPTH`] is rejected.
    pub async fn create_section(
        &self,
        params: CreateSectionParams,
    ) -> Result<String, SectionServiceError> {
        let name = normalize_name(&params.name)?;
        if params.anchor_id.is_none() && params.anchor_position.is_some() {
            return Err(SectionServiceError::validation(
                "anchor_position requires anchor_section_id",
            ));
        }

        let section = Section {
            id: Section::generate_id(),
            parent_id: None,
            section_key: Section::generate_key(),
            name,
            order: 0,
            is_leaf: true,
        };

        let conn = self.db.begin_write().await?;
        let result = Self::create_in_tx(&conn, section, &params).await;
        let created = self.db.finish_write(&conn, result).await?;

        tracing::info!(
            "Created section {} under {:?} at order {}",
            created.id,
            created.parent_id,
            created.order
        );
        Ok(created.id)
    }

    async fn create_in_tx(
        conn: &Connection,
        mut section: Section,
        params: &CreateSectionParams,
    ) -> Result<Section, SectionServiceError> {
        let store = SectionStore::new(conn);

        let (parent_id, siblings, sequence, depth) = match params.anchor_id.as_deref() {
            Some(anchor_id) => {
                let anchor = store
                    .get_section(anchor_id)
                    .await?
                    .ok_or_else(|| SectionServiceError::not_found("Anchor section", anchor_id))?;

                if let Some(requested) = params.parent_id.as_deref() {
                    if anchor.parent_id.as_deref() != Some(requested) {
                        return Err(SectionServiceError::conflict(format!(
                            "parent_id '{}' does not match the parent of anchor '{}'",
                            requested, anchor.id
                        )));
                    }
                }

                let siblings = store.get_siblings(anchor.parent_id.as_deref()).await?;
                let position = params.anchor_position.unwrap_or(AnchorPosition::After);
                let sequence = SiblingOrderCalculator::insert_relative(
                    &ids_of(&siblings),
                    &section.id,
                    &anchor.id,
                    position,
                )
                .ok_or_else(|| {
                    SectionServiceError::conflict(format!(
                        "anchor '{}' is missing from its sibling group",
                        anchor.id
                    ))
                })?;
                let depth = store.get_depth(&anchor.id).await?;
                (anchor.parent_id, siblings, sequence, depth)
            }
            None => {
                let depth = match params.parent_id.as_deref() {
                    Some(parent_id) => {
                        store.get_section(parent_id).await?.ok_or_else(|| {
                            SectionServiceError::not_found("Parent section", parent_id)
                        })?;
                        store.get_depth(parent_id).await? + 1
                    }
                    None => 1,
                };

                let siblings = store.get_siblings(params.parent_id.as_deref()).await?;
                let mut sequence = ids_of(&siblings);
                sequence.push(section.id.clone());
                (params.parent_id.clone(), siblings, sequence, depth)
            }
        };

        if depth > MAX_SECTION_DEPTH {
            return Err(SectionServiceError::validation(format!(
                "Section would be nested {} levels deep; the maximum is {}",
                depth, MAX_SECTION_DEPTH
            )));
        }

        let renumbered = SiblingOrderCalculator::renumber(&sequence);
        let (own_row, sibling_rows): (Vec<_>, Vec<_>) = renumbered
            .into_iter()
            .partition(|(id, _)| *id == section.id);

        section.parent_id = parent_id;
        section.order = own_row
            .first()
            .map(|(_, order)| *order)
            .unwrap_or(sequence.len() as i64);

        store.insert_section(&section).await?;
        store.apply_orders(&siblings, &sibling_rows).await?;

        Ok(section)
    }

    /// Delete a section using the given strategy
    ///
    /// - `Cascade` removes the section and every descendant.
    /// - `LiftChildren` moves the direct children into the deleted section's
    ///   slot among its siblings, keeping their relative order, then removes it.
    ///
    /// The deleted section's former sibling group is renumbered.
    pub async fn delete_section(
        &self,
        id: &str,
        strategy: DeleteStrategy,
    ) -> Result<DeleteOutcome, SectionServiceError> {
        let conn = self.db.begin_write().await?;
        let result = Self::delete_in_tx(&conn, id, strategy).await;
        let outcome = self.db.finish_write(&conn, result).await?;

        tracing::info!(
            "Deleted section {} ({}): removed {}, lifted {}",
            id,
            strategy,
            outcome.deleted_ids.len(),
            outcome.lifted_ids.len()
        );
        Ok(outcome)
    }

    async fn delete_in_tx(
        conn: &Connection,
        id: &str,
        strategy: DeleteStrategy,
    ) -> Result<DeleteOutcome, SectionServiceError> {
        let store = SectionStore::new(conn);
        let section = store
            .get_section(id)
            .await?
            .ok_or_else(|| SectionServiceError::section_not_found(id))?;
        let siblings = store.get_siblings(section.parent_id.as_deref()).await?;
        let sibling_ids = ids_of(&siblings);

        match strategy {
            DeleteStrategy::Cascade => {
                let subtree = store.get_subtree_ids(&section.id).await?;
                // Deepest first so no row outlives its parent.
                for doomed in subtree.iter().rev() {
                    store.delete_section(doomed).await?;
                }

                let remaining: Vec<String> = sibling_ids
                    .into_iter()
                    .filter(|sibling| *sibling != section.id)
                    .collect();
                let renumbered = SiblingOrderCalculator::renumber(&remaining);
                store.apply_orders(&siblings, &renumbered).await?;

                Ok(DeleteOutcome {
                    deleted_ids: subtree,
                    lifted_ids: Vec::new(),
                })
            }
            DeleteStrategy::LiftChildren => {
                let children = store.get_siblings(Some(&section.id)).await?;
                let child_ids = ids_of(&children);

                let merged =
                    SiblingOrderCalculator::splice_replace(&sibling_ids, &section.id, &child_ids)
                        .ok_or_else(|| {
                            SectionServiceError::conflict(format!(
                                "section '{}' is missing from its sibling group",
                                section.id
                            ))
                        })?;
                let renumbered = SiblingOrderCalculator::renumber(&merged);
                let (lifted_rows, sibling_rows): (Vec<_>, Vec<_>) = renumbered
                    .into_iter()
                    .partition(|(row_id, _)| child_ids.contains(row_id));

                for (child_id, order) in &lifted_rows {
                    store
                        .update_parent(child_id, section.parent_id.as_deref(), *order)
                        .await?;
                }
                store.delete_section(&section.id).await?;
                store.apply_orders(&siblings, &sibling_rows).await?;

                Ok(DeleteOutcome {
                    deleted_ids: vec![section.id],
                    lifted_ids: child_ids,
                })
            }
        }
    }

    /// Move a section immediately before/after a sibling
    ///
    /// Both sections must share the same parent; a move never changes
    /// `parent_id`. The whole sibling group is renumbered afterwards.
    pub async fn move_section(
        &self,
        section_id: &str,
        target_section_id: &str,
        position: AnchorPosition,
    ) -> Result<(), SectionServiceError> {
        if section_id == target_section_id {
            return Err(SectionServiceError::conflict(
                "Cannot move a section relative to itself",
            ));
        }

        let conn = self.db.begin_write().await?;
        let result = Self::move_in_tx(&conn, section_id, target_section_id, position).await;
        let renumbered = self.db.finish_write(&conn, result).await?;

        tracing::info!(
            "Moved section {} {} {} ({} row(s) renumbered)",
            section_id,
            position,
            target_section_id,
            renumbered
        );
        Ok(())
    }

    async fn move_in_tx(
        conn: &Connection,
        section_id: &str,
        target_section_id: &str,
        position: AnchorPosition,
    ) -> Result<usize, SectionServiceError> {
        let store = SectionStore::new(conn);
        let section = store
            .get_section(section_id)
            .await?
            .ok_or_else(|| SectionServiceError::section_not_found(section_id))?;
        let target = store
            .get_section(target_section_id)
            .await?
            .ok_or_else(|| SectionServiceError::not_found("Target section", target_section_id))?;

        if section.parent_id != target.parent_id {
            return Err(SectionServiceError::conflict(format!(
                "Cannot move section '{}' next to '{}': sections have different parents",
                section.id, target.id
            )));
        }

        let siblings = store.get_siblings(section.parent_id.as_deref()).await?;
        let sequence = SiblingOrderCalculator::move_relative(
            &ids_of(&siblings),
            &section.id,
            &target.id,
            position,
        )
        .ok_or_else(|| {
            SectionServiceError::conflict(format!(
                "sections '{}' and '{}' are not in the same sibling group",
                section.id, target.id
            ))
        })?;

        let renumbered = SiblingOrderCalculator::renumber(&sequence);
        Ok(store.apply_orders(&siblings, &renumbered).await?)
    }
}
