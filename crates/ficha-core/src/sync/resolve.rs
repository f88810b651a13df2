//! Conflict resolution between one local and one remote version of a
//! record.
//!
//! `resolve` is pure and total: the same pair and policy always produce
//! the same winner, which is what lets independent devices converge when
//! each runs the resolver on the same pair.

use serde::{Deserialize, Serialize};

use crate::config::ConflictPolicy;
use crate::models::PatientRecord;
use crate::sync::signature::data_signature;
use crate::sync::version::VersionVector;

/// Which side of the conflict won. Fixed roles, not argument positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Side {
    Local,
    Remote,
}

/// Why the winner won; first applicable rule decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveReason {
    NewerUpdatedAt,
    NewerSyncMetaUpdatedAt,
    NewerCreatedAt,
    IdenticalContent,
    EqualTimestampPolicy,
}

/// Outcome of resolving one conflicting id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub winner: Side,
    pub reason: ResolveReason,
}

/// Decide which version of the same record wins.
///
/// Rules, in strict order:
/// 1. larger `updated_at`
/// 2. larger `sync_meta.updated_at`
/// 3. larger `created_at`
/// 4. identical content → local (arbitrary but stable, avoids churn)
/// 5. true tie with differing content → `policy` decides
#[must_use]
pub fn resolve(local: &PatientRecord, remote: &PatientRecord, policy: ConflictPolicy) -> Resolution {
    let local_version = VersionVector::of(local);
    let remote_version = VersionVector::of(remote);

    if local_version.updated_at != remote_version.updated_at {
        return Resolution {
            winner: newer_side(local_version.updated_at, remote_version.updated_at),
            reason: ResolveReason::NewerUpdatedAt,
        };
    }
    if local_version.sync_updated_at != remote_version.sync_updated_at {
        return Resolution {
            winner: newer_side(local_version.sync_updated_at, remote_version.sync_updated_at),
            reason: ResolveReason::NewerSyncMetaUpdatedAt,
        };
    }
    if local_version.created_at != remote_version.created_at {
        return Resolution {
            winner: newer_side(local_version.created_at, remote_version.created_at),
            reason: ResolveReason::NewerCreatedAt,
        };
    }
    if data_signature(local) == data_signature(remote) {
        return Resolution {
            winner: Side::Local,
            reason: ResolveReason::IdenticalContent,
        };
    }

    let winner = match policy {
        ConflictPolicy::NewerWinsLocalTie => Side::Local,
        ConflictPolicy::NewerWinsRemoteTie => Side::Remote,
    };
    Resolution {
        winner,
        reason: ResolveReason::EqualTimestampPolicy,
    }
}

const fn newer_side(local_value: i64, remote_value: i64) -> Side {
    if local_value > remote_value {
        Side::Local
    } else {
        Side::Remote
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::SyncMeta;

    fn record(updated_at: i64, sync_updated_at: i64, created_at: i64) -> PatientRecord {
        PatientRecord {
            id: "p1".to_string(),
            updated_at,
            created_at,
            sync_meta: SyncMeta {
                updated_at: sync_updated_at,
            },
            ..PatientRecord::default()
        }
    }

    #[test]
    fn test_newer_updated_at_wins() {
        let local = record(10, 0, 0);
        let remote = record(20, 0, 0);
        let resolution = resolve(&local, &remote, ConflictPolicy::NewerWinsLocalTie);
        assert_eq!(resolution.winner, Side::Remote);
        assert_eq!(resolution.reason, ResolveReason::NewerUpdatedAt);

        let resolution = resolve(&remote, &local, ConflictPolicy::NewerWinsLocalTie);
        assert_eq!(resolution.winner, Side::Local);
        assert_eq!(resolution.reason, ResolveReason::NewerUpdatedAt);
    }

    #[test]
    fn test_sync_meta_breaks_updated_at_tie() {
        let local = record(10, 5, 0);
        let remote = record(10, 9, 0);
        let resolution = resolve(&local, &remote, ConflictPolicy::NewerWinsLocalTie);
        assert_eq!(resolution.winner, Side::Remote);
        assert_eq!(resolution.reason, ResolveReason::NewerSyncMetaUpdatedAt);
    }

    #[test]
    fn test_created_at_breaks_remaining_tie() {
        let local = record(10, 5, 7);
        let remote = record(10, 5, 3);
        let resolution = resolve(&local, &remote, ConflictPolicy::NewerWinsLocalTie);
        assert_eq!(resolution.winner, Side::Local);
        assert_eq!(resolution.reason, ResolveReason::NewerCreatedAt);
    }

    #[test]
    fn test_identical_content_keeps_local() {
        let local = record(10, 5, 3);
        let remote = local.clone();
        let resolution = resolve(&local, &remote, ConflictPolicy::NewerWinsRemoteTie);
        assert_eq!(resolution.winner, Side::Local);
        assert_eq!(resolution.reason, ResolveReason::IdenticalContent);
    }

    #[test]
    fn test_true_tie_follows_policy() {
        let mut local = record(0, 0, 0);
        local.diagnosis = "preeclampsia".to_string();
        let mut remote = record(0, 0, 0);
        remote.diagnosis = "colestasia".to_string();

        let resolution = resolve(&local, &remote, ConflictPolicy::NewerWinsLocalTie);
        assert_eq!(resolution.winner, Side::Local);
        assert_eq!(resolution.reason, ResolveReason::EqualTimestampPolicy);

        let resolution = resolve(&local, &remote, ConflictPolicy::NewerWinsRemoteTie);
        assert_eq!(resolution.winner, Side::Remote);
        assert_eq!(resolution.reason, ResolveReason::EqualTimestampPolicy);

        // The tie winner is a role, not a payload: swapping the arguments
        // still picks the side the policy names.
        let swapped = resolve(&remote, &local, ConflictPolicy::NewerWinsLocalTie);
        assert_eq!(swapped.winner, Side::Local);
        let swapped = resolve(&remote, &local, ConflictPolicy::NewerWinsRemoteTie);
        assert_eq!(swapped.winner, Side::Remote);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let mut local = record(0, 0, 0);
        local.diagnosis = "a".to_string();
        let mut remote = record(0, 0, 0);
        remote.diagnosis = "b".to_string();

        let first = resolve(&local, &remote, ConflictPolicy::NewerWinsLocalTie);
        for _ in 0..10 {
            let again = resolve(&local, &remote, ConflictPolicy::NewerWinsLocalTie);
            assert_eq!(again, first);
        }
    }
}
