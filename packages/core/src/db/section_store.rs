//! Section Store - Tree Accessor and row writes
//!
//! `SectionStore` borrows one libsql connection, normally the one holding the
//! caller's open write transaction, so every read observes the writes already
//! made inside that transaction.
//!
//! # Row Format
//!
//! All section reads select, in order:
//! - id (TEXT)
//! - parent_id (TEXT, nullable)
//! - section_key (TEXT)
//! - name (TEXT)
//! - order (INTEGER)
//! - is_leaf (INTEGER 0/1, computed)

use crate::db::error::DatabaseError;
use crate::models::Section;
use libsql::{Connection, Row};

const SECTION_COLUMNS: &str = r#"s.id, s.parent_id, s.section_key, s.name, s."order",
    NOT EXISTS (SELECT 1 FROM document_section c WHERE c.parent_id = s.id) AS is_leaf"#;

/// Reads and writes sections through a borrowed connection
pub struct SectionStore<'a> {
    conn: &'a Connection,
}

impl<'a> SectionStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Convert a libsql row to a `Section`
    fn row_to_section(row: &Row) -> Result<Section, DatabaseError> {
        let is_leaf: i64 = row.get(5)?;
        Ok(Section {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            section_key: row.get(2)?,
            name: row.get(3)?,
            order: row.get(4)?,
            is_leaf: is_leaf != 0,
        })
    }

    async fn collect_sections(
        &self,
        mut rows: libsql::Rows,
    ) -> Result<Vec<Section>, DatabaseError> {
        let mut sections = Vec::new();
        while let Some(row) = rows.next().await? {
            sections.push(Self::row_to_section(&row)?);
        }
        Ok(sections)
    }

    //
    // TREE ACCESSOR (read-only)
    //

    /// Fetch one section, `None` if it does not exist
    pub async fn get_section(&self, id: &str) -> Result<Option<Section>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {} FROM document_section s WHERE s.id = ?",
                    SECTION_COLUMNS
                ),
                [id],
            )
            .await
            .map_err(|e| {
                DatabaseError::query(format!("Failed to execute get_section query: {}", e))
            })?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_section(&row)?)),
            None => Ok(None),
        }
    }

    /// Sibling group under `parent_id` (`None` = roots), ascending by order
    ///
    /// Ties, which only exist in data written outside the engine, fall back to
    /// id so the sequence stays deterministic.
    pub async fn get_siblings(
        &self,
        parent_id: Option<&str>,
    ) -> Result<Vec<Section>, DatabaseError> {
        let rows = self
            .conn
            .query(
                &format!(
                    r#"SELECT {} FROM document_section s
                       WHERE s.parent_id IS ?
                       ORDER BY s."order", s.id"#,
                    SECTION_COLUMNS
                ),
                [parent_id],
            )
            .await
            .map_err(|e| {
                DatabaseError::query(format!(
                    "Failed to execute get_siblings query: {}",
                    e
                ))
            })?;

        self.collect_sections(rows).await
    }

    /// The section itself followed by all transitive descendants, shallowest first
    ///
    /// Returns an empty list when `id` does not exist.
    pub async fn get_subtree_ids(&self, id: &str) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                r#"WITH RECURSIVE subtree(id, depth) AS (
                     SELECT id, 0 FROM document_section WHERE id = ?
                     UNION ALL
                     SELECT d.id, s.depth + 1
                     FROM document_section d
                     JOIN subtree s ON d.parent_id = s.id
                   )
                   SELECT id FROM subtree ORDER BY depth, id"#,
                [id],
            )
            .await
            .map_err(|e| {
                DatabaseError::query(format!(
                    "Failed to execute get_subtree_ids query: {}",
                    e
                ))
            })?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    /// Number of sections on the path from the root down to `id`, inclusive
    ///
    /// A root has depth 1; an unknown id has depth 0.
    pub async fn get_depth(&self, id: &str) -> Result<usize, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                r#"WITH RECURSIVE ancestors(id, parent_id) AS (
                     SELECT id, parent_id FROM document_section WHERE id = ?
                     UNION ALL
                     SELECT d.id, d.parent_id
                     FROM document_section d
                     JOIN ancestors a ON d.id = a.parent_id
                   )
                   SELECT COUNT(*) FROM ancestors"#,
                [id],
            )
            .await
            .map_err(|e| {
                DatabaseError::query(format!("Failed to execute get_depth query: {}", e))
            })?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.max(0) as usize),
            None => Ok(0),
        }
    }

    /// Every section, grouped by parent and ascending by order
    pub async fn list_sections(&self) -> Result<Vec<Section>, DatabaseError> {
        let rows = self
            .conn
            .query(
                &format!(
                    r#"SELECT {} FROM document_section s
                       ORDER BY s.parent_id, s."order", s.id"#,
                    SECTION_COLUMNS
                ),
                (),
            )
            .await
            .map_err(|e| {
                DatabaseError::query(format!(
                    "Failed to execute list_sections query: {}",
                    e
                ))
            })?;

        self.collect_sections(rows).await
    }

    //
    // ROW WRITES (callers hold the transaction)
    //

    /// Insert a section row; `is_leaf` is ignored
    pub async fn insert_section(&self, section: &Section) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                r#"INSERT INTO document_section (id, parent_id, section_key, name, "order")
                   VALUES (?, ?, ?, ?, ?)"#,
                (
                    section.id.as_str(),
                    section.parent_id.as_deref(),
                    section.section_key.as_str(),
                    section.name.as_str(),
                    section.order,
                ),
            )
            .await
            .map_err(|e| {
                DatabaseError::query(format!(
                    "Failed to insert section {}: {}",
                    section.id, e
                ))
            })?;
        Ok(())
    }

    /// Set the display name
    pub async fn update_name(&self, id: &str, name: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "UPDATE document_section SET name = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                (name, id),
            )
            .await
            .map_err(|e| {
                DatabaseError::query(format!("Failed to rename section {}: {}", id, e))
            })?;
        Ok(())
    }

    /// Set the order value within the current sibling group
    pub async fn update_order(&self, id: &str, order: i64) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                r#"UPDATE document_section
                   SET "order" = ?, updated_at = CURRENT_TIMESTAMP
                   WHERE id = ?"#,
                (order, id),
            )
            .await
            .map_err(|e| {
                DatabaseError::query(format!(
                    "Failed to update order of section {}: {}",
                    id, e
                ))
            })?;
        Ok(())
    }

    /// Reattach a section to another parent at the given order
    pub async fn update_parent(
        &self,
        id: &str,
        parent_id: Option<&str>,
        order: i64,
    ) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                r#"UPDATE document_section
                   SET parent_id = ?, "order" = ?, updated_at = CURRENT_TIMESTAMP
                   WHERE id = ?"#,
                (parent_id, order, id),
            )
            .await
            .map_err(|e| {
                DatabaseError::query(format!(
                    "Failed to reparent section {}: {}",
                    id, e
                ))
            })?;
        Ok(())
    }

    /// Delete one section row, returning the number of rows removed
    pub async fn delete_section(&self, id: &str) -> Result<u64, DatabaseError> {
        self.conn
            .execute("DELETE FROM document_section WHERE id = ?", [id])
            .await
            .map_err(|e| {
                DatabaseError::query(format!("Failed to delete section {}: {}", id, e))
            })
    }

    /// Delete every section, children before parents
    pub async fn delete_all(&self) -> Result<u64, DatabaseError> {
        // Clearing parent links first keeps every statement FK-valid.
        self.conn
            .execute("UPDATE document_section SET parent_id = NULL", ())
            .await
            .map_err(|e| {
                DatabaseError::query(format!("Failed to detach sections: {}", e))
            })?;

        self.conn
            .execute("DELETE FROM document_section", ())
            .await
            .map_err(|e| {
                DatabaseError::query(format!("Failed to clear sections: {}", e))
            })
    }

    /// Write new order values for a sibling group, skipping unchanged rows
    pub async fn apply_orders(
        &self,
        current: &[Section],
        renumbered: &[(String, i64)],
    ) -> Result<usize, DatabaseError> {
        let persisted: Vec<(String, i64)> = current
            .iter()
            .map(|s| (s.id.clone(), s.order))
            .collect();
        let changed =
            crate::db::SiblingOrderCalculator::changed_assignments(&persisted, renumbered);

        for (id, order) in &changed {
            self.update_order(id, *order).await?;
        }
        Ok(changed.len())
    }
}
