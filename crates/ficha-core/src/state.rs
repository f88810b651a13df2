//! Shared sync state types.

/// Lifecycle of the sync orchestrator, observed by the app shell.
///
/// A cycle moves `Idle → Syncing → (Settled | Failed)`. Repeated failures
/// park the orchestrator in `Cooldown` until the cooldown window elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
    Settled,
    Failed,
    Cooldown,
}
