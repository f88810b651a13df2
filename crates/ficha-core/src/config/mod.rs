//! Sync policy configuration.
//!
//! Read-only inputs to the conflict resolver, dropout guard, and
//! orchestrator. Values are fixed policy for a deployment, loaded once by
//! the app shell; nothing here is tuned per call.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Grace window protecting a just-created local record from a stale remote
/// read that has not caught up yet (Unix ms).
pub const DEFAULT_MERGE_GRACE_PERIOD_MS: i64 = 10_000;
/// Consecutive failed cycles tolerated before entering cooldown.
pub const DEFAULT_MAX_CONSECUTIVE_SYNC_FAILURES: u32 = 3;
/// Cooldown window after sync exhaustion (Unix ms).
pub const DEFAULT_SYNC_COOLDOWN_MS: i64 = 15_000;
/// Settle window after a confirmed remote deletion, covering in-flight
/// change-feed echoes of the deleted record (Unix ms).
pub const DEFAULT_DELETION_SETTLE_MS: i64 = 2_000;

const DEFAULT_DROPOUT_MIN_LOCAL_RECORDS: usize = 8;
const DEFAULT_DROPOUT_MAX_REMOVAL_RATIO: f64 = 0.45;
const DEFAULT_DROPOUT_MAX_REMOTE_MISSING_RATIO: f64 = 0.35;

/// Tie-break policy when two versions of a record share an identical
/// version vector but differ in content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    #[default]
    NewerWinsLocalTie,
    NewerWinsRemoteTie,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewerWinsLocalTie => write!(f, "newer-wins-local-tie"),
            Self::NewerWinsRemoteTie => write!(f, "newer-wins-remote-tie"),
        }
    }
}

/// Thresholds for the mass-removal (dropout) guard.
///
/// Tunable policy, not a hard invariant: the guard trades a small chance of
/// delaying real mass deletions for protection against transient partial
/// remote reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DropoutConfig {
    pub enabled: bool,
    /// Guard only engages once the local collection has at least this many
    /// records.
    pub min_local_records: usize,
    /// Maximum tolerated fraction of local ids missing from the remote
    /// snapshot.
    pub max_removal_ratio: f64,
    /// Maximum tolerated fraction of unexplained removals relative to the
    /// remote snapshot size.
    pub max_remote_missing_ratio: f64,
}

impl Default for DropoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_local_records: DEFAULT_DROPOUT_MIN_LOCAL_RECORDS,
            max_removal_ratio: DEFAULT_DROPOUT_MAX_REMOVAL_RATIO,
            max_remote_missing_ratio: DEFAULT_DROPOUT_MAX_REMOTE_MISSING_RATIO,
        }
    }
}

/// Full sync policy consumed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub conflict_policy: ConflictPolicy,
    pub merge_grace_period_ms: i64,
    pub dropout: DropoutConfig,
    pub max_consecutive_sync_failures: u32,
    pub sync_cooldown_ms: i64,
    pub deletion_settle_ms: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            merge_grace_period_ms: DEFAULT_MERGE_GRACE_PERIOD_MS,
            dropout: DropoutConfig::default(),
            max_consecutive_sync_failures: DEFAULT_MAX_CONSECUTIVE_SYNC_FAILURES,
            sync_cooldown_ms: DEFAULT_SYNC_COOLDOWN_MS,
            deletion_settle_ms: DEFAULT_DELETION_SETTLE_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults_match_policy_constants() {
        let config = SyncConfig::default();
        assert_eq!(config.conflict_policy, ConflictPolicy::NewerWinsLocalTie);
        assert_eq!(config.merge_grace_period_ms, 10_000);
        assert_eq!(config.max_consecutive_sync_failures, 3);
        assert_eq!(config.sync_cooldown_ms, 15_000);
        assert_eq!(config.deletion_settle_ms, 2_000);
        assert!(config.dropout.enabled);
        assert_eq!(config.dropout.min_local_records, 8);
        assert!((config.dropout.max_removal_ratio - 0.45).abs() < f64::EPSILON);
        assert!((config.dropout.max_remote_missing_ratio - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn test_policy_serde_round_trip() {
        let json = serde_json::to_string(&ConflictPolicy::NewerWinsRemoteTie).unwrap();
        assert_eq!(json, r#""newer-wins-remote-tie""#);
        let parsed: ConflictPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ConflictPolicy::NewerWinsRemoteTie);
    }

    #[test]
    fn test_config_deserializes_partial_input() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"conflictPolicy":"newer-wins-remote-tie"}"#).unwrap();
        assert_eq!(config.conflict_policy, ConflictPolicy::NewerWinsRemoteTie);
        assert_eq!(config.sync_cooldown_ms, DEFAULT_SYNC_COOLDOWN_MS);
    }
}
