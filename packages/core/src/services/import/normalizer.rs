//! Import Normalizer
//!
//! Turns heterogeneous flat JSON records into a validated, internally
//! consistent section set before anything is written:
//!
//! 1. Alias resolution (`section_key`/`section_id`, `name`/`section_title`)
//! 2. Internal keys (explicit key, or input position) with duplicate detection
//! 3. Parent resolution (absent or unknown `parent_key` means root)
//! 4. Cycle detection over the resolved parent links
//! 5. Depth limit ([`MAX_SECTION_DEPTH`]) on every parent chain
//! 6. Contiguous per-group orders
//!
//! The resulting [`ImportPlan`] lists sections parents-first so it can be
//! inserted row by row without violating foreign keys.

use crate::db::SiblingOrderCalculator;
use crate::models::MAX_SECTION_DEPTH;
use crate::services::error::SectionServiceError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

const SLUG_PATTERN: &str = r"[^a-z0-9]+";

/// One input record after alias resolution and field validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub section_key: Option<String>,
    pub name: String,
    pub parent_key: Option<String>,
    pub order: Option<i64>,
}

/// Stable internal identity of a record within one import
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// Supplied `section_key`/`section_id`
    Explicit(String),
    /// Input position of a keyless record
    Positional(usize),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Explicit(key) => write!(f, "{}", key),
            RecordKey::Positional(idx) => write!(f, "#{}", idx + 1),
        }
    }
}

/// A record ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSection {
    /// Input position
    pub index: usize,
    pub key: RecordKey,
    /// Advisory key written to the store
    pub section_key: String,
    pub name: String,
    /// Input position of the resolved parent, `None` for roots
    pub parent: Option<usize>,
    /// Contiguous order within the resolved parent group
    pub order: i64,
}

/// Validated section set, parents before children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    pub sections: Vec<PlannedSection>,
}

impl ImportPlan {
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections without a parent in the imported set
    pub fn root_count(&self) -> usize {
        self.sections.iter().filter(|s| s.parent.is_none()).count()
    }

    /// Sections that no imported section references as parent
    pub fn leaf_count(&self) -> usize {
        let parents: HashSet<usize> = self.sections.iter().filter_map(|s| s.parent).collect();
        self.sections
            .iter()
            .filter(|s| !parents.contains(&s.index))
            .count()
    }
}

/// Read a key-like field: strings are trimmed, numbers rendered as text,
/// blanks and nulls are absent
fn key_field(
    object: &Map<String, Value>,
    field: &str,
    index: usize,
) -> Result<Option<String>, SectionServiceError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(SectionServiceError::validation(format!(
            "Section {}: '{}' must be a string or number, got {}",
            index + 1,
            field,
            other
        ))),
    }
}

/// First present value among aliased fields
fn aliased_field(
    object: &Map<String, Value>,
    fields: &[&str],
    index: usize,
) -> Result<Option<String>, SectionServiceError> {
    for field in fields {
        if let Some(value) = key_field(object, field, index)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn order_field(
    object: &Map<String, Value>,
    index: usize,
) -> Result<Option<i64>, SectionServiceError> {
    match object.get("order") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(order) if order >= 1 => Ok(Some(order)),
            _ => Err(SectionServiceError::validation(format!(
                "Section {}: 'order' must be an integer >= 1, got {}",
                index + 1,
                n
            ))),
        },
        Some(other) => Err(SectionServiceError::validation(format!(
            "Section {}: 'order' must be an integer >= 1, got {}",
            index + 1,
            other
        ))),
    }
}

/// Canonicalize raw JSON into records
///
/// The top level must be an array of objects.
pub fn parse_records(raw: &Value) -> Result<Vec<ImportRecord>, SectionServiceError> {
    let items = raw.as_array().ok_or_else(|| {
        SectionServiceError::validation("Template must be a JSON array of sections")
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let object = item.as_object().ok_or_else(|| {
                SectionServiceError::validation(format!(
                    "Section {} must be a JSON object",
                    index + 1
                ))
            })?;

            let name = aliased_field(object, &["name", "section_title"], index)?.ok_or_else(|| {
                SectionServiceError::validation(format!(
                    "Each section must include name/section_title (section {})",
                    index + 1
                ))
            })?;

            Ok(ImportRecord {
                section_key: aliased_field(object, &["section_key", "section_id"], index)?,
                name,
                parent_key: key_field(object, "parent_key", index)?,
                order: order_field(object, index)?,
            })
        })
        .collect()
}

/// Slug used for generated keys: lowercase, runs of non `[a-z0-9]` become `-`
pub fn slugify(name: &str) -> String {
    static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    let slug_regex = SLUG_REGEX.get_or_init(|| Regex::new(SLUG_PATTERN).unwrap());

    let lowered = name.to_lowercase();
    let replaced = slug_regex.replace_all(&lowered, "-");
    let slug = replaced.trim_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// Assigns `u.<slug>`, `u.<slug>.2`, ... never reusing a taken key
struct KeyGenerator {
    taken: HashSet<String>,
    counts: HashMap<String, usize>,
}

impl KeyGenerator {
    fn new(explicit: impl IntoIterator<Item = String>) -> Self {
        Self {
            taken: explicit.into_iter().collect(),
            counts: HashMap::new(),
        }
    }

    fn next(&mut self, name: &str) -> String {
        let slug = slugify(name);
        loop {
            let count = self.counts.entry(slug.clone()).or_insert(0);
            *count += 1;
            let candidate = if *count == 1 {
                format!("u.{}", slug)
            } else {
                format!("u.{}.{}", slug, count)
            };
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Normalizer settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Derive a missing `parent_key` from a dotted key (`1.2.3` -> `1.2`)
    pub infer_dotted_parents: bool,
}

/// Validate records and compute the plan
pub fn normalize(
    records: Vec<ImportRecord>,
    options: NormalizeOptions,
) -> Result<ImportPlan, SectionServiceError> {
    // Internal keys and duplicate detection.
    let mut key_index: HashMap<String, usize> = HashMap::new();
    let mut keys = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match &record.section_key {
            Some(key) => {
                if key_index.insert(key.clone(), index).is_some() {
                    return Err(SectionServiceError::validation(format!(
                        "Duplicate section_key: {}",
                        key
                    )));
                }
                keys.push(RecordKey::Explicit(key.clone()));
            }
            None => keys.push(RecordKey::Positional(index)),
        }
    }

    // Parent resolution.
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let parent_key = record.parent_key.clone().or_else(|| {
            if !options.infer_dotted_parents {
                return None;
            }
            record
                .section_key
                .as_deref()
                .and_then(|key| key.rsplit_once('.'))
                .map(|(prefix, _)| prefix.to_string())
        });

        let parent = match parent_key {
            None => None,
            Some(parent_key) => match key_index.get(&parent_key) {
                Some(parent_index) => Some(*parent_index),
                None => {
                    tracing::warn!(
                        "Section {} references unknown parent_key '{}', importing as root",
                        keys[index],
                        parent_key
                    );
                    None
                }
            },
        };
        parents.push(parent);
    }

    detect_cycles(&parents, &keys)?;
    check_depth(&parents, &keys)?;

    // Per-group orders: explicit values sort first by value, missing values
    // take the record's position within its group; ties keep input order.
    let mut groups: HashMap<Option<usize>, Vec<(usize, i64, usize)>> = HashMap::new();
    let mut group_order: Vec<Option<usize>> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let members = groups.entry(parents[index]).or_insert_with(|| {
            group_order.push(parents[index]);
            Vec::new()
        });
        let fallback = members.len() as i64 + 1;
        members.push((index, record.order.unwrap_or(fallback), index));
    }

    let mut orders = vec![0i64; records.len()];
    for members in groups.values() {
        let sequence = SiblingOrderCalculator::sequence_by_order(members);
        for (index, order) in SiblingOrderCalculator::renumber(&sequence) {
            orders[index] = order;
        }
    }

    let mut generator = KeyGenerator::new(key_index.keys().cloned());
    let mut planned: Vec<Option<PlannedSection>> = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let section_key = match record.section_key {
                Some(key) => key,
                None => generator.next(&record.name),
            };
            Some(PlannedSection {
                index,
                key: keys[index].clone(),
                section_key,
                name: record.name,
                parent: parents[index],
                order: orders[index],
            })
        })
        .collect();

    // Parents first: walk groups breadth-first from the roots.
    let mut children: HashMap<Option<usize>, Vec<usize>> = HashMap::new();
    for parent in &group_order {
        if let Some(members) = groups.get(parent) {
            let mut ids: Vec<usize> = members.iter().map(|(index, _, _)| *index).collect();
            ids.sort_by_key(|index| orders[*index]);
            children.insert(*parent, ids);
        }
    }

    let mut sections = Vec::with_capacity(planned.len());
    let mut queue: std::collections::VecDeque<usize> =
        children.get(&None).cloned().unwrap_or_default().into();
    while let Some(index) = queue.pop_front() {
        if let Some(section) = planned[index].take() {
            sections.push(section);
        }
        if let Some(kids) = children.get(&Some(index)) {
            queue.extend(kids.iter().copied());
        }
    }

    Ok(ImportPlan { sections })
}

/// Reject any parent chain that loops back on itself
fn detect_cycles(parents: &[Option<usize>], keys: &[RecordKey]) -> Result<(), SectionServiceError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; parents.len()];
    for start in 0..parents.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        let mut path: Vec<usize> = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current {
            match marks[index] {
                Mark::Done => break,
                Mark::InProgress => {
                    let cycle_start = path.iter().position(|p| *p == index).unwrap_or(0);
                    let mut chain: Vec<String> =
                        path[cycle_start..].iter().map(|i| keys[*i].to_string()).collect();
                    chain.push(keys[index].to_string());
                    return Err(SectionServiceError::validation(format!(
                        "Cyclic parent reference: {}",
                        chain.join(" -> ")
                    )));
                }
                Mark::Unvisited => {
                    marks[index] = Mark::InProgress;
                    path.push(index);
                    current = parents[index];
                }
            }
        }

        for index in path {
            marks[index] = Mark::Done;
        }
    }
    Ok(())
}

/// Reject parent chains nested deeper than [`MAX_SECTION_DEPTH`]
///
/// Expects an acyclic parent vector. Depths are memoized, so every record is
/// walked once.
fn check_depth(parents: &[Option<usize>], keys: &[RecordKey]) -> Result<(), SectionServiceError> {
    let mut depths = vec![0usize; parents.len()];
    for start in 0..parents.len() {
        if depths[start] != 0 {
            continue;
        }

        let mut path = Vec::new();
        let mut base = 0;
        let mut current = Some(start);
        while let Some(index) = current {
            if depths[index] != 0 {
                base = depths[index];
                break;
            }
            path.push(index);
            current = parents[index];
        }

        for (offset, index) in path.iter().rev().enumerate() {
            let depth = base + offset + 1;
            if depth > MAX_SECTION_DEPTH {
                return Err(SectionServiceError::validation(format!(
                    "Section {} is nested {} levels deep; the maximum is {}",
                    keys[*index], depth, MAX_SECTION_DEPTH
                )));
            }
            depths[*index] = depth;
        }
    }
    Ok(())
}
