//! Sync change model

use std::fmt;

use serde::{Deserialize, Serialize};

/// How one record id changed across a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Add,
    Update,
    Remove,
}

/// One reconciliation outcome. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChange {
    pub kind: ChangeKind,
    pub id: String,
}

impl SyncChange {
    #[must_use]
    pub fn new(kind: ChangeKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Aggregated counts for one sync cycle, surfaced to the app shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl SyncSummary {
    #[must_use]
    pub fn from_changes(changes: &[SyncChange]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.kind {
                ChangeKind::Add => summary.added += 1,
                ChangeKind::Update => summary.updated += 1,
                ChangeKind::Remove => summary.removed += 1,
            }
        }
        summary
    }

    /// True when the cycle produced no adds, updates, or removals.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "No changes")
        } else {
            write!(
                f,
                "Added: {} · Updated: {} · Removed: {}",
                self.added, self.updated, self.removed
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_summary_counts() {
        let changes = vec![
            SyncChange::new(ChangeKind::Add, "a"),
            SyncChange::new(ChangeKind::Add, "b"),
            SyncChange::new(ChangeKind::Update, "c"),
            SyncChange::new(ChangeKind::Remove, "d"),
        ];
        let summary = SyncSummary::from_changes(&changes);
        assert_eq!(summary.added, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.to_string(), "Added: 2 · Updated: 1 · Removed: 1");
    }

    #[test]
    fn test_empty_summary() {
        let summary = SyncSummary::from_changes(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.to_string(), "No changes");
    }
}
