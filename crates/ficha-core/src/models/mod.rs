//! Data models for ficha-core

mod attachment;
mod patient;
mod sync_change;
mod task;

pub use attachment::AttachedFile;
pub use patient::{PatientRecord, SyncMeta};
pub use sync_change::{ChangeKind, SyncChange, SyncSummary};
pub use task::PendingTask;
