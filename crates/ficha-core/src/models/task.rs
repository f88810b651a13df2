//! Pending task sub-entity

use serde::{Deserialize, Serialize};

/// A task attached to a patient record.
///
/// Tasks with blank text after trimming are dropped during normalization;
/// `completed_at`/`completion_note` are only meaningful while
/// `is_completed` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTask {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_completed: bool,
    /// Creation timestamp (Unix ms).
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub completion_note: Option<String>,
}
