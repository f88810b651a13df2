//! Record set reconciliation.
//!
//! The single authority for what a record collection looks like after any
//! local or remote batch update: add and update paths funnel through here
//! instead of mutating the collection directly, so the unique-id invariant
//! always holds.

use std::collections::HashMap;

use crate::models::PatientRecord;
use crate::sync::normalize::normalize_record;
use crate::sync::version::VersionVector;

/// Deduplicate a collection by id, keeping the freshest version of each.
///
/// - every record is normalized on input
/// - records with a blank id are dropped
/// - for duplicate ids the higher version vector wins; on an exactly
///   equal vector the later-encountered record wins (last-seen-wins)
/// - output preserves the first-occurrence order of surviving ids
///
/// Idempotent: reconciling an already-reconciled collection is a no-op.
#[must_use]
pub fn reconcile(records: Vec<PatientRecord>) -> Vec<PatientRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut freshest: HashMap<String, PatientRecord> = HashMap::with_capacity(records.len());

    for record in records {
        let record = normalize_record(record);
        if record.id.is_empty() {
            continue;
        }

        let keep = match freshest.get(&record.id) {
            None => {
                order.push(record.id.clone());
                true
            }
            Some(existing) => VersionVector::of(&record) >= VersionVector::of(existing),
        };
        if keep {
            freshest.insert(record.id.clone(), record);
        }
    }

    order
        .into_iter()
        .filter_map(|id| freshest.remove(&id))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(id: &str, name: &str, updated_at: i64) -> PatientRecord {
        PatientRecord {
            id: id.to_string(),
            name: name.to_string(),
            updated_at,
            ..PatientRecord::default()
        }
    }

    #[test]
    fn test_duplicate_ids_keep_newest() {
        let merged = reconcile(vec![
            record("1", "A-old", 10),
            record("1", "A-new", 20),
            record("2", "B", 5),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "1");
        assert_eq!(merged[0].name, "A-new");
        assert_eq!(merged[1].id, "2");
    }

    #[test]
    fn test_newest_wins_regardless_of_input_order() {
        let merged = reconcile(vec![record("1", "A-new", 20), record("1", "A-old", 10)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "A-new");
    }

    #[test]
    fn test_equal_version_later_record_wins() {
        let merged = reconcile(vec![record("1", "first", 10), record("1", "second", 10)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "second");
    }

    #[test]
    fn test_blank_ids_are_dropped() {
        let merged = reconcile(vec![
            record("", "no id", 10),
            record("   ", "blank id", 10),
            record("1", "keep", 10),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "1");
    }

    #[test]
    fn test_preserves_first_occurrence_order() {
        let merged = reconcile(vec![
            record("b", "B", 1),
            record("a", "A-old", 1),
            record("c", "C", 1),
            record("a", "A-new", 2),
        ]);
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(merged[1].name, "A-new");
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let once = reconcile(vec![
            record("1", "A-old", 10),
            record("1", "A-new", 20),
            record("2", "B", 5),
        ]);
        let twice = reconcile(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_duplicate_ids_in_output() {
        let merged = reconcile(vec![
            record("1", "a", 1),
            record("2", "b", 2),
            record("1", "c", 3),
            record("2", "d", 1),
        ]);
        let mut ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), merged.len());
    }
}
