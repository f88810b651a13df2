//! Sync orchestration.
//!
//! Drives one sync cycle at a time: load local state, merge the latest
//! remote snapshot through the conflict resolver and guards, and commit
//! the merged collection when it actually changed. Cycles are serialized
//! by construction: `run` is the single consumer of the trigger channel
//! and every cycle takes `&mut self`, so a trigger arriving mid-cycle
//! waits in the queue instead of racing the collection.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::models::{ChangeKind, PatientRecord, SyncChange, SyncSummary};
use crate::state::SyncState;
use crate::store::{LocalStore, RemoteStore};
use crate::sync::guard::{evaluate_dropout, DropoutVerdict, PendingDeletions};
use crate::sync::reconcile::reconcile;
use crate::sync::resolve::{resolve, Side};
use crate::sync::signature::{collection_state_hash, sync_state_signature};
use crate::sync::version::{within_grace_period, VersionVector};
use crate::Result;

/// What woke the orchestrator up.
#[derive(Debug, Clone)]
pub enum SyncTrigger {
    /// A local edit was saved.
    LocalSave,
    /// The remote change feed delivered a full snapshot.
    RemoteSnapshot(Vec<PatientRecord>),
    /// Periodic timer.
    Interval,
}

/// Result of one sync cycle.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub state: SyncState,
    pub summary: SyncSummary,
    pub changes: Vec<SyncChange>,
    /// Whether the merged collection was committed.
    pub applied: bool,
    /// Whether the remote snapshot was rejected as a dropout artifact.
    pub dropout_rejected: bool,
}

impl SyncOutcome {
    fn coalesced() -> Self {
        Self {
            state: SyncState::Cooldown,
            summary: SyncSummary::default(),
            changes: Vec::new(),
            applied: false,
            dropout_rejected: false,
        }
    }
}

/// Owns the sync cycle state machine and the pending-deletion set.
pub struct SyncOrchestrator<L, R> {
    local: L,
    remote: R,
    config: SyncConfig,
    pending_deletions: PendingDeletions,
    state: SyncState,
    consecutive_failures: u32,
    cooldown_until_ms: Option<i64>,
    last_synced_ms: Option<i64>,
    /// Last snapshot seen from the remote feed, reused by timer- and
    /// save-triggered cycles until the feed delivers a fresh one.
    last_remote_snapshot: Option<Vec<PatientRecord>>,
    /// State hash of the last successful remote push.
    last_pushed_hash: Option<String>,
}

impl<L: LocalStore, R: RemoteStore> SyncOrchestrator<L, R> {
    #[must_use]
    pub fn new(local: L, remote: R, config: SyncConfig) -> Self {
        Self {
            local,
            remote,
            config,
            pending_deletions: PendingDeletions::new(),
            state: SyncState::Idle,
            consecutive_failures: 0,
            cooldown_until_ms: None,
            last_synced_ms: None,
            last_remote_snapshot: None,
            last_pushed_hash: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    /// Unix ms of the last settled cycle, if any.
    #[must_use]
    pub const fn last_synced_ms(&self) -> Option<i64> {
        self.last_synced_ms
    }

    /// Consume triggers until the channel closes.
    ///
    /// Dropping every sender is the unsubscribe: the loop drains what is
    /// queued and returns. Cycle errors are already logged and counted, so
    /// the loop survives them; the caller's retry/backoff policy reacts to
    /// the per-cycle errors it gets from its own store adapters.
    pub async fn run(mut self, mut triggers: mpsc::Receiver<SyncTrigger>) {
        while let Some(trigger) = triggers.recv().await {
            // Failures are already logged and counted by the cycle itself.
            let _ = self.handle_trigger(trigger).await;
        }
    }

    /// Run one cycle for the given trigger.
    pub async fn handle_trigger(&mut self, trigger: SyncTrigger) -> Result<SyncOutcome> {
        match trigger {
            SyncTrigger::RemoteSnapshot(records) => self.sync_cycle(Some(records)).await,
            SyncTrigger::LocalSave | SyncTrigger::Interval => self.sync_cycle(None).await,
        }
    }

    /// Add a new locally-created record.
    ///
    /// Funnels through the reconciler so the unique-id invariant holds no
    /// matter what the collection looked like before.
    pub async fn add_record(&mut self, record: PatientRecord) -> Result<Vec<PatientRecord>> {
        self.save_through_reconcile(record).await
    }

    /// Apply a local edit to an existing record.
    pub async fn update_record(&mut self, record: PatientRecord) -> Result<Vec<PatientRecord>> {
        self.save_through_reconcile(record).await
    }

    async fn save_through_reconcile(
        &mut self,
        record: PatientRecord,
    ) -> Result<Vec<PatientRecord>> {
        let mut records = self.local.load_records().await?;
        records.push(record);
        let records = reconcile(records);
        self.local.save_records(&records).await?;
        Ok(records)
    }

    /// Delete a record everywhere.
    ///
    /// The pending-deletion marker is set synchronously before any store
    /// I/O, so a change-feed echo racing this call cannot resurrect the
    /// record; the marker only clears after the remote confirms AND the
    /// settle window elapses.
    pub async fn delete_record(&mut self, id: &str) -> Result<()> {
        self.pending_deletions.mark(id);

        let mut records = self.local.load_records().await?;
        records.retain(|record| record.id != id);
        let records = reconcile(records);
        self.local.save_records(&records).await?;

        // A cached snapshot may still carry the record; scrub it so a
        // timer-triggered cycle after the settle window cannot re-add it.
        if let Some(snapshot) = &mut self.last_remote_snapshot {
            snapshot.retain(|record| record.id != id);
        }

        self.remote.delete_record(id).await?;
        self.pending_deletions.confirm_remote_delete(
            id,
            now_ms(),
            self.config.deletion_settle_ms,
        );
        Ok(())
    }

    /// Run one full sync cycle.
    ///
    /// `remote_snapshot` replaces the cached feed snapshot when present.
    /// Returns the cycle outcome; store errors propagate once per cycle
    /// after being recorded in the failure counter.
    pub async fn sync_cycle(
        &mut self,
        remote_snapshot: Option<Vec<PatientRecord>>,
    ) -> Result<SyncOutcome> {
        let now = now_ms();

        if let Some(until) = self.cooldown_until_ms {
            if now < until {
                debug!(
                    source = "sync",
                    remaining_ms = until - now,
                    "trigger coalesced during cooldown"
                );
                return Ok(SyncOutcome::coalesced());
            }
            self.cooldown_until_ms = None;
            self.consecutive_failures = 0;
            self.state = SyncState::Idle;
        }

        match self.run_cycle(remote_snapshot, now).await {
            Ok(outcome) => {
                self.consecutive_failures = 0;
                self.state = SyncState::Settled;
                self.last_synced_ms = Some(now);
                Ok(outcome)
            }
            Err(err) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.max_consecutive_sync_failures {
                    self.cooldown_until_ms = Some(now + self.config.sync_cooldown_ms);
                    self.state = SyncState::Cooldown;
                    error!(
                        source = "sync",
                        failures = self.consecutive_failures,
                        cooldown_ms = self.config.sync_cooldown_ms,
                        error = %err,
                        "sync exhausted, entering cooldown"
                    );
                } else {
                    self.state = SyncState::Failed;
                    error!(
                        source = "sync",
                        failures = self.consecutive_failures,
                        error = %err,
                        "sync cycle failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn run_cycle(
        &mut self,
        remote_snapshot: Option<Vec<PatientRecord>>,
        now: i64,
    ) -> Result<SyncOutcome> {
        self.state = SyncState::Syncing;
        self.pending_deletions.purge_expired(now);

        let committed = reconcile(self.local.load_records().await?);

        if let Some(snapshot) = remote_snapshot {
            self.last_remote_snapshot = Some(snapshot);
        }

        let (merged, dropout_rejected) = match self.last_remote_snapshot.clone() {
            None => (committed.clone(), false),
            Some(snapshot) => {
                let snapshot = self.pending_deletions.filter_records(reconcile(snapshot));
                match evaluate_dropout(&committed, &snapshot, &self.config.dropout) {
                    DropoutVerdict::Reject {
                        missing_local,
                        removal_ratio,
                        remote_missing_ratio,
                    } => {
                        warn!(
                            source = "sync",
                            missing_local,
                            removal_ratio,
                            remote_missing_ratio,
                            "remote snapshot looks like a dropout artifact, keeping local state"
                        );
                        (committed.clone(), true)
                    }
                    DropoutVerdict::Accept => (self.merge(&committed, snapshot, now), false),
                }
            }
        };

        let changes = diff_changes(&committed, &merged);
        let summary = SyncSummary::from_changes(&changes);
        let merged_hash = collection_state_hash(&merged);
        let equivalent = merged_hash == collection_state_hash(&committed);
        let should_apply = !changes.is_empty() && !equivalent;

        if should_apply {
            self.local.save_records(&merged).await?;
        }
        // A rejected snapshot means the remote read is suspect: the merge
        // carries none of the snapshot's records, so a whole-collection push
        // would wipe anything only the remote holds. Hold the push (and the
        // pushed-hash marker) until a snapshot passes the guard.
        if !dropout_rejected && self.last_pushed_hash.as_deref() != Some(merged_hash.as_str()) {
            self.remote.push_records(&merged, &merged_hash).await?;
            self.last_pushed_hash = Some(merged_hash);
        }

        if should_apply {
            info!(
                source = "sync",
                added = summary.added,
                updated = summary.updated,
                removed = summary.removed,
                "sync settled: {summary}"
            );
        } else {
            debug!(source = "sync", "sync settled with no changes");
        }

        Ok(SyncOutcome {
            state: SyncState::Settled,
            summary,
            changes,
            applied: should_apply,
            dropout_rejected,
        })
    }

    /// Merge local state with an accepted remote snapshot.
    ///
    /// Per-id rules:
    /// - both sides → conflict resolver, with the grace period protecting
    ///   a fresh local record from a stale remote read (grace never
    ///   overrides a strictly newer remote `updated_at`)
    /// - remote only → add (deletion guard already filtered the snapshot)
    /// - local only → kept while plausibly unsynced (`sync_meta` still
    ///   zero, or within the grace period); a record the remote store
    ///   once acknowledged and no longer carries was deleted elsewhere
    ///   and is removed
    fn merge(
        &self,
        local: &[PatientRecord],
        remote: Vec<PatientRecord>,
        now: i64,
    ) -> Vec<PatientRecord> {
        let mut remote_by_id: HashMap<String, PatientRecord> = remote
            .iter()
            .map(|record| (record.id.clone(), record.clone()))
            .collect();

        let mut merged: Vec<PatientRecord> = Vec::with_capacity(local.len() + remote.len());
        for local_record in local {
            if let Some(remote_record) = remote_by_id.remove(&local_record.id) {
                let resolution = resolve(local_record, &remote_record, self.config.conflict_policy);
                let keep_local = match resolution.winner {
                    Side::Local => true,
                    Side::Remote => {
                        let remote_not_newer = VersionVector::of(&remote_record).updated_at
                            <= VersionVector::of(local_record).updated_at;
                        remote_not_newer
                            && within_grace_period(
                                local_record,
                                now,
                                self.config.merge_grace_period_ms,
                            )
                    }
                };
                if keep_local {
                    merged.push(local_record.clone());
                } else {
                    debug!(
                        source = "sync",
                        id = %local_record.id,
                        reason = ?resolution.reason,
                        "remote version won conflict"
                    );
                    merged.push(remote_record);
                }
            } else {
                let never_synced = VersionVector::of(local_record).sync_updated_at == 0;
                if never_synced
                    || within_grace_period(local_record, now, self.config.merge_grace_period_ms)
                {
                    merged.push(local_record.clone());
                } else {
                    debug!(
                        source = "sync",
                        id = %local_record.id,
                        "record deleted on another device, removing locally"
                    );
                }
            }
        }

        // Remaining remote ids are unconditional adds. Keep the snapshot's
        // own ordering for them.
        for record in remote {
            if let Some(addition) = remote_by_id.remove(&record.id) {
                merged.push(addition);
            }
        }

        reconcile(merged)
    }
}

/// Classify per-id differences between the committed and merged sets.
fn diff_changes(committed: &[PatientRecord], merged: &[PatientRecord]) -> Vec<SyncChange> {
    let committed_by_id: HashMap<&str, &PatientRecord> = committed
        .iter()
        .map(|record| (record.id.as_str(), record))
        .collect();

    let mut changes = Vec::new();
    for record in merged {
        match committed_by_id.get(record.id.as_str()) {
            None => changes.push(SyncChange::new(ChangeKind::Add, record.id.clone())),
            Some(existing) => {
                if sync_state_signature(existing) != sync_state_signature(record) {
                    changes.push(SyncChange::new(ChangeKind::Update, record.id.clone()));
                }
            }
        }
    }
    for record in committed {
        if !merged.iter().any(|r| r.id == record.id) {
            changes.push(SyncChange::new(ChangeKind::Remove, record.id.clone()));
        }
    }
    changes
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
