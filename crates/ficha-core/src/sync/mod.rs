//! Offline-first synchronization and conflict resolution.
//!
//! Layering, leaves first: `version` and `signature` feed `normalize` and
//! `reconcile`; `reconcile` and `resolve` feed the orchestrator; `guard`
//! wraps the orchestrator's apply step. All ordering decisions go through
//! the version vector — never message arrival order, which across devices
//! does not reflect causal order.

pub mod guard;
pub mod normalize;
pub mod orchestrator;
pub mod reconcile;
pub mod resolve;
pub mod signature;
pub mod version;

pub use guard::{evaluate_dropout, DropoutVerdict, PendingDeletions};
pub use normalize::{normalize_files, normalize_record, normalize_tasks};
pub use orchestrator::{SyncOrchestrator, SyncOutcome, SyncTrigger};
pub use reconcile::reconcile;
pub use resolve::{resolve, Resolution, ResolveReason, Side};
pub use signature::{
    collection_state_hash, data_signature, records_equivalent, sync_state_signature,
};
pub use version::{within_grace_period, VersionVector};
