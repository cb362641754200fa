//! Bulk Import
//!
//! Loads a flat JSON template into the section table. Parsing and validation
//! happen in [`normalizer`] before any transaction is opened; persistence is
//! one `BEGIN IMMEDIATE` transaction that inserts the plan parents-first.

pub mod normalizer;

use crate::db::{DatabaseError, SectionStore};
use crate::models::Section;
use crate::services::error::SectionServiceError;
use crate::services::section_service::SectionService;
use libsql::Connection;
use normalizer::{ImportPlan, NormalizeOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use normalizer::{ImportRecord, PlannedSection, RecordKey};

/// What happens to the existing tree during an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Delete every existing section, then insert
    #[default]
    Replace,
    /// Keep existing sections; imported roots go after the existing roots
    Append,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Replace => write!(f, "replace"),
            ImportMode::Append => write!(f, "append"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(ImportMode::Replace),
            "append" => Ok(ImportMode::Append),
            other => Err(format!(
                "Invalid import mode '{}': expected 'replace' or 'append'",
                other
            )),
        }
    }
}

/// Import settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub mode: ImportMode,
    pub infer_dotted_parents: bool,
}

/// Summary of a committed import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub roots: usize,
    pub leaves: usize,
    pub source: String,
}

impl SectionService {
    /// Import an already parsed JSON value
    pub async fn import_value(
        &self,
        raw: &Value,
        source: &str,
        options: ImportOptions,
    ) -> Result<ImportReport, SectionServiceError> {
        let records = normalizer::parse_records(raw)?;
        let plan = normalizer::normalize(
            records,
            NormalizeOptions {
                infer_dotted_parents: options.infer_dotted_parents,
            },
        )?;

        let db = self.database();
        let conn = db.begin_write().await?;
        let result = Self::import_in_tx(&conn, &plan, options.mode).await;
        let inserted = db.finish_write(&conn, result).await?;

        let report = ImportReport {
            inserted,
            roots: plan.root_count(),
            leaves: plan.leaf_count(),
            source: source.to_string(),
        };

        tracing::info!(
            "Imported {} section(s) from {} ({} mode): {} root(s), {} leaf/leaves",
            report.inserted,
            report.source,
            options.mode,
            report.roots,
            report.leaves
        );
        Ok(report)
    }

    /// Import raw bytes that must be UTF-8 encoded JSON
    pub async fn import_from_bytes(
        &self,
        bytes: &[u8],
        source: &str,
        options: ImportOptions,
    ) -> Result<ImportReport, SectionServiceError> {
        let text = std::str::from_utf8(bytes).map_err(|_| {
            SectionServiceError::validation("Uploaded file must be UTF-8 encoded JSON")
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let raw: Value = serde_json::from_str(text).map_err(|e| {
            SectionServiceError::validation(format!(
                "Invalid JSON in template file: {} ({})",
                source, e
            ))
        })?;

        self.import_value(&raw, source, options).await
    }

    /// Import a JSON template file from the server filesystem
    pub async fn import_from_path(
        &self,
        path: &Path,
        options: ImportOptions,
    ) -> Result<ImportReport, SectionServiceError> {
        let source = path.display().to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SectionServiceError::source_not_found(&source),
            _ => SectionServiceError::SourceUnreadable {
                path: source.clone(),
                source: e,
            },
        })?;

        self.import_from_bytes(&bytes, &source, options).await
    }

    async fn import_in_tx(
        conn: &Connection,
        plan: &ImportPlan,
        mode: ImportMode,
    ) -> Result<usize, SectionServiceError> {
        let store = SectionStore::new(conn);

        let root_offset = match mode {
            ImportMode::Replace => {
                let removed = store.delete_all().await?;
                tracing::debug!("Import replace mode cleared {} section(s)", removed);
                0
            }
            ImportMode::Append => store.get_siblings(None).await?.len() as i64,
        };

        let mut ids: HashMap<usize, String> = HashMap::with_capacity(plan.len());
        for planned in &plan.sections {
            let parent_id = match planned.parent {
                None => None,
                Some(parent_index) => Some(ids.get(&parent_index).cloned().ok_or_else(|| {
                    DatabaseError::query(format!(
                        "Parent of import record {} was not inserted before it",
                        planned.key
                    ))
                })?),
            };
            let order = match parent_id {
                None => planned.order + root_offset,
                Some(_) => planned.order,
            };

            let section = Section {
                id: Section::generate_id(),
                parent_id,
                section_key: planned.section_key.clone(),
                name: planned.name.clone(),
                order,
                is_leaf: true,
            };
            store.insert_section(&section).await?;
            ids.insert(planned.index, section.id);
        }

        Ok(ids.len())
    }
}
