//! Sibling ordering
//!
//! Pure sequence edits over the ids of one sibling group plus the contiguous
//! renumbering applied after every structural change. Nothing here touches the
//! store; callers persist the returned assignments.

use crate::models::AnchorPosition;
use std::collections::HashMap;

/// Computes sibling sequences and their contiguous order values
pub struct SiblingOrderCalculator;

impl SiblingOrderCalculator {
    /// Assign contiguous orders `1..=N` following the given sequence
    ///
    /// # Example
    /// Input:  `["b", "c", "a"]`
    /// Output: `[("b", 1), ("c", 2), ("a", 3)]`
    pub fn renumber<T: Clone>(ids: &[T]) -> Vec<(T, i64)> {
        ids.iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx as i64 + 1))
            .collect()
    }

    /// Insert `new_id` immediately before/after `anchor_id`
    ///
    /// Returns `None` when the anchor is not part of the sequence.
    pub fn insert_relative(
        sequence: &[String],
        new_id: &str,
        anchor_id: &str,
        position: AnchorPosition,
    ) -> Option<Vec<String>> {
        let anchor_idx = sequence.iter().position(|id| id == anchor_id)?;
        let insert_at = match position {
            AnchorPosition::Before => anchor_idx,
            AnchorPosition::After => anchor_idx + 1,
        };

        let mut result = sequence.to_vec();
        result.insert(insert_at, new_id.to_string());
        Some(result)
    }

    /// Move `moved_id` immediately before/after `target_id`
    ///
    /// The moved id is removed first and the target is located in the
    /// shortened sequence, so the result is the same whichever side of the
    /// target the moved id started on. Returns `None` if either id is absent
    /// or both are the same id.
    ///
    /// # Example
    /// `move_relative(["a", "b", "c"], "a", "c", After)` => `["b", "c", "a"]`
    pub fn move_relative(
        sequence: &[String],
        moved_id: &str,
        target_id: &str,
        position: AnchorPosition,
    ) -> Option<Vec<String>> {
        if moved_id == target_id {
            return None;
        }
        let moved_idx = sequence.iter().position(|id| id == moved_id)?;

        let mut result = sequence.to_vec();
        let moved = result.remove(moved_idx);

        let target_idx = result.iter().position(|id| id == target_id)?;
        let insert_at = match position {
            AnchorPosition::Before => target_idx,
            AnchorPosition::After => target_idx + 1,
        };
        result.insert(insert_at, moved);
        Some(result)
    }

    /// Replace `removed_id` by `replacements`, keeping them contiguous at its index
    ///
    /// Returns `None` when `removed_id` is absent.
    pub fn splice_replace(
        sequence: &[String],
        removed_id: &str,
        replacements: &[String],
    ) -> Option<Vec<String>> {
        let idx = sequence.iter().position(|id| id == removed_id)?;

        let mut result = Vec::with_capacity(sequence.len() + replacements.len());
        result.extend_from_slice(&sequence[..idx]);
        result.extend_from_slice(replacements);
        result.extend_from_slice(&sequence[idx + 1..]);
        Some(result)
    }

    /// Sequence keys by explicit order, breaking ties by input position
    ///
    /// Items are `(key, order, input_position)`. Used by the import path where
    /// supplied orders may have gaps or collide.
    pub fn sequence_by_order<K: Clone>(items: &[(K, i64, usize)]) -> Vec<K> {
        let mut sorted: Vec<&(K, i64, usize)> = items.iter().collect();
        sorted.sort_by_key(|(_, order, position)| (*order, *position));
        sorted.into_iter().map(|(key, _, _)| key.clone()).collect()
    }

    /// Assignments whose order differs from what is currently persisted
    ///
    /// Ids missing from `current` are always reported.
    pub fn changed_assignments(
        current: &[(String, i64)],
        renumbered: &[(String, i64)],
    ) -> Vec<(String, i64)> {
        let persisted: HashMap<&str, i64> = current
            .iter()
            .map(|(id, order)| (id.as_str(), *order))
            .collect();

        renumbered
            .iter()
            .filter(|(id, order)| persisted.get(id.as_str()) != Some(order))
            .cloned()
            .collect()
    }

    /// Whether orders are exactly `1..=N` in the given sequence
    pub fn is_contiguous(orders: &[i64]) -> bool {
        orders
            .iter()
            .enumerate()
            .all(|(idx, order)| *order == idx as i64 + 1)
    }
}
