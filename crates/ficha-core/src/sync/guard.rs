//! Deletion tracking and dropout protection.
//!
//! Two independent protections for a sync cycle:
//! - `PendingDeletions` tracks ids the user explicitly deleted so a
//!   concurrent remote echo cannot resurrect them.
//! - `evaluate_dropout` rejects a remote snapshot that looks like a
//!   mass-deletion artifact (stale or partial remote read).

use std::collections::HashMap;

use tracing::debug;

use crate::config::DropoutConfig;
use crate::models::PatientRecord;

/// Ids awaiting deletion, owned by the orchestrator.
///
/// A marker is added synchronously at the moment of deletion and released
/// only after the remote store confirms the deletion AND the settle window
/// elapses, letting any in-flight change-feed notification for the old
/// record pass through and be ignored. Markers are monotonic: nothing
/// removes one before its deadline.
#[derive(Debug, Default)]
pub struct PendingDeletions {
    /// id → settle deadline (Unix ms); `None` until the remote confirms.
    markers: HashMap<String, Option<i64>>,
}

impl PendingDeletions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an id as pending deletion. Called at delete-intent time,
    /// before any store I/O.
    pub fn mark(&mut self, id: impl Into<String>) {
        self.markers.insert(id.into(), None);
    }

    /// Start the settle window after the remote store confirmed the
    /// deletion. A marker that was already confirmed keeps its earlier
    /// deadline.
    pub fn confirm_remote_delete(&mut self, id: &str, now_ms: i64, settle_ms: i64) {
        if let Some(deadline) = self.markers.get_mut(id) {
            if deadline.is_none() {
                *deadline = Some(now_ms.saturating_add(settle_ms));
            }
        }
    }

    /// Drop a marker unconditionally. Idempotent.
    pub fn clear(&mut self, id: &str) {
        self.markers.remove(id);
    }

    /// Whether incoming remote records with this id must be filtered out.
    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.markers.contains_key(id)
    }

    /// Release markers whose settle deadline has passed.
    pub fn purge_expired(&mut self, now_ms: i64) {
        self.markers
            .retain(|_, deadline| deadline.is_none_or(|at| now_ms < at));
    }

    /// Remove every record whose id is pending deletion.
    ///
    /// Deletion intent always wins over a stale resurrection, regardless
    /// of the incoming record's version vector.
    #[must_use]
    pub fn filter_records(&self, records: Vec<PatientRecord>) -> Vec<PatientRecord> {
        if self.markers.is_empty() {
            return records;
        }
        records
            .into_iter()
            .filter(|record| {
                let pending = self.is_pending(&record.id);
                if pending {
                    debug!(
                        source = "sync",
                        id = %record.id,
                        "dropping remote echo of record pending deletion"
                    );
                }
                !pending
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Verdict of the mass-removal guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropoutVerdict {
    Accept,
    Reject {
        missing_local: usize,
        removal_ratio: f64,
        remote_missing_ratio: f64,
    },
}

impl DropoutVerdict {
    #[must_use]
    pub const fn is_reject(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }
}

/// Decide whether a remote snapshot may be applied against local state.
///
/// Rejects only when all three hold:
/// - local collection size ≥ `min_local_records`
/// - fraction of local ids missing from the snapshot > `max_removal_ratio`
/// - missing count relative to snapshot size > `max_remote_missing_ratio`
///
/// Advisory, tunable policy: rejection means "fall back to local for this
/// cycle", never a fatal error.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn evaluate_dropout(
    local: &[PatientRecord],
    remote: &[PatientRecord],
    config: &DropoutConfig,
) -> DropoutVerdict {
    if !config.enabled || local.len() < config.min_local_records {
        return DropoutVerdict::Accept;
    }

    let missing_local = local
        .iter()
        .filter(|record| !remote.iter().any(|r| r.id == record.id))
        .count();
    if missing_local == 0 {
        return DropoutVerdict::Accept;
    }

    let removal_ratio = missing_local as f64 / local.len() as f64;
    // An empty snapshot explains nothing; treat it as fully missing.
    let remote_missing_ratio = if remote.is_empty() {
        1.0
    } else {
        missing_local as f64 / remote.len() as f64
    };

    if removal_ratio > config.max_removal_ratio
        && remote_missing_ratio > config.max_remote_missing_ratio
    {
        DropoutVerdict::Reject {
            missing_local,
            removal_ratio,
            remote_missing_ratio,
        }
    } else {
        DropoutVerdict::Accept
    }
}
