//! Attached file sub-entity

use serde::{Deserialize, Serialize};

/// File metadata attached to a patient record.
///
/// `id` and `name` are required; a file missing either is dropped during
/// normalization. The remaining fields are display metadata and never
/// influence merge ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFile {
    #[serde(default)]
    pub id: String,
    /// Original file name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: i64,
    /// Upload timestamp (Unix ms).
    #[serde(default)]
    pub uploaded_at: i64,
    #[serde(default)]
    pub drive_url: String,
    #[serde(default)]
    pub custom_title: Option<String>,
    #[serde(default)]
    pub custom_type_label: Option<String>,
    #[serde(default)]
    pub note_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
