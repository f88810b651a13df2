//! Version vector extraction and freshness checks.
//!
//! Every ordering decision in the merge path goes through the
//! `(updated_at, sync_updated_at, created_at)` triple; wall-clock "now"
//! only appears in the grace-period check.

use crate::models::PatientRecord;

/// Comparable freshness triple for one record version.
///
/// Field order matters: the derived `Ord` compares `updated_at` first,
/// then `sync_updated_at`, then `created_at`, which is exactly the
/// priority order the conflict resolver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionVector {
    pub updated_at: i64,
    pub sync_updated_at: i64,
    pub created_at: i64,
}

impl VersionVector {
    /// Extract the version vector of a record.
    ///
    /// Absent or negative timestamps normalize to `0`, which is treated
    /// as "unknown / oldest". Pure; never fails.
    #[must_use]
    pub fn of(record: &PatientRecord) -> Self {
        Self {
            updated_at: clamp_timestamp(record.updated_at),
            sync_updated_at: clamp_timestamp(record.sync_meta.updated_at),
            created_at: clamp_timestamp(record.created_at),
        }
    }
}

/// Normalize a timestamp to the valid range, mapping negatives to `0`.
#[must_use]
pub const fn clamp_timestamp(value: i64) -> i64 {
    if value < 0 {
        0
    } else {
        value
    }
}

/// Whether a record is still within the merge grace period.
///
/// True when `now_ms - max(updated_at, created_at) < grace_ms`, or
/// unconditionally when both timestamps are `0`: a record of unknown age
/// is treated as still fresh, erring toward protecting new, unsynced
/// local data.
#[must_use]
pub fn within_grace_period(record: &PatientRecord, now_ms: i64, grace_ms: i64) -> bool {
    let version = VersionVector::of(record);
    let last_known = version.updated_at.max(version.created_at);
    if last_known == 0 {
        return true;
    }
    now_ms.saturating_sub(last_known) < grace_ms
}
