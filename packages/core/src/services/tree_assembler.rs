//! Tree Assembler
//!
//! Converts the flat section table into the nested response shape and back.
//! Pure and read-only: `flatten(assemble(sections))` returns the same section
//! set, ordered parent-first.

use crate::models::{Section, SectionTree};
use std::collections::{HashMap, HashSet};

/// Builds nested section trees from flat rows
pub struct TreeAssembler;

impl TreeAssembler {
    /// Group by parent, sort each group by order, attach children recursively
    ///
    /// Roots (`parent_id == None`) come back in ascending order. Rows whose
    /// parent is not part of `sections` cannot be placed and are skipped.
    pub fn assemble(sections: Vec<Section>) -> Vec<SectionTree> {
        let total = sections.len();
        let known_ids: HashSet<String> = sections.iter().map(|s| s.id.clone()).collect();

        let mut groups: HashMap<Option<String>, Vec<Section>> = HashMap::new();
        for section in sections {
            groups
                .entry(section.parent_id.clone())
                .or_default()
                .push(section);
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        }

        let roots = Self::build_group(None, &mut groups);

        let placed: usize = roots.iter().map(SectionTree::size).sum();
        if placed != total {
            let orphans: Vec<&Option<String>> = groups
                .keys()
                .filter(|parent| {
                    parent
                        .as_ref()
                        .is_some_and(|parent_id| !known_ids.contains(parent_id))
                })
                .collect();
            tracing::warn!(
                "Tree assembly skipped {} section(s) with unknown parents: {:?}",
                total - placed,
                orphans
            );
        }

        roots
    }

    fn build_group(
        parent_id: Option<String>,
        groups: &mut HashMap<Option<String>, Vec<Section>>,
    ) -> Vec<SectionTree> {
        let Some(group) = groups.remove(&parent_id) else {
            return Vec::new();
        };

        group
            .into_iter()
            .map(|section| {
                let mut node = SectionTree::from_section(section);
                node.children = Self::build_group(Some(node.id.clone()), groups);
                node.is_leaf = node.children.is_empty();
                node
            })
            .collect()
    }

    /// Flatten nested trees back into rows, each parent before its children
    pub fn flatten(trees: &[SectionTree]) -> Vec<Section> {
        let mut out = Vec::new();
        Self::flatten_into(trees, &mut out);
        out
    }

    fn flatten_into(trees: &[SectionTree], out: &mut Vec<Section>) {
        for tree in trees {
            out.push(tree.to_section());
            Self::flatten_into(&tree.children, out);
        }
    }
}
