//! Patient record model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AttachedFile, PendingTask};

/// Bookkeeping written by the remote store on every accepted write.
///
/// `updated_at` may lag or lead the record's own `updated_at`; it is the
/// second component of the version vector, never a replacement for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    /// Timestamp the remote store stamped on its last write (Unix ms).
    #[serde(default)]
    pub updated_at: i64,
}

/// A patient record, the unit of sync.
///
/// Field names serialize in camelCase to stay compatible with data already
/// persisted by existing installs; every field the legacy store may omit
/// carries `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    /// Stable identifier, assigned at creation, immutable.
    #[serde(default)]
    pub id: String,
    /// Patient display name.
    #[serde(default)]
    pub name: String,
    /// External identifier string (RUT).
    #[serde(default)]
    pub rut: String,
    /// Birth date as stored (free-form string, not interpreted by sync).
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub gender: String,
    /// Classification id.
    #[serde(default)]
    pub type_id: String,
    #[serde(default)]
    pub entry_time: Option<String>,
    #[serde(default)]
    pub exit_time: Option<String>,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub clinical_note: String,
    /// Logical day the record belongs to; immutable after creation.
    #[serde(default)]
    pub date: String,
    /// External attachment-folder reference, if one was provisioned.
    #[serde(default)]
    pub drive_folder_id: Option<String>,
    #[serde(default)]
    pub pending_tasks: Vec<PendingTask>,
    #[serde(default)]
    pub attached_files: Vec<AttachedFile>,
    /// Creation timestamp (Unix ms), set once.
    #[serde(default)]
    pub created_at: i64,
    /// Bumped on every local mutation (Unix ms).
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub sync_meta: SyncMeta,
}

impl PatientRecord {
    /// Create a new local record with a uuid-v7 id and fresh timestamps.
    #[must_use]
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            date: date.into(),
            created_at: now,
            updated_at: now,
            ..Self::default()
        }
    }

    /// Bump `updated_at` after a local edit.
    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_new_record_timestamps() {
        let record = PatientRecord::new("Ana Rojas", "2026-08-27");
        assert!(!record.id.is_empty());
        assert!(record.created_at > 0);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.sync_meta.updated_at, 0);
    }

    #[test]
    fn test_new_record_ids_unique() {
        let a = PatientRecord::new("A", "2026-08-27");
        let b = PatientRecord::new("B", "2026-08-27");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_touch_bumps_updated_at() {
        let mut record = PatientRecord::new("Ana", "2026-08-27");
        let later = record.updated_at + 5_000;
        record.touch(later);
        assert_eq!(record.updated_at, later);
    }

    #[test]
    fn test_serde_field_names_are_camel_case() {
        let record = PatientRecord {
            id: "p1".to_string(),
            drive_folder_id: Some("folder".to_string()),
            ..PatientRecord::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["driveFolderId"], "folder");
        assert!(json.get("birthDate").is_some());
        assert!(json.get("clinicalNote").is_some());
        assert!(json["syncMeta"].get("updatedAt").is_some());
    }

    #[test]
    fn test_deserialize_tolerates_missing_fields() {
        let record: PatientRecord = serde_json::from_str(r#"{"id":"p1"}"#).unwrap();
        assert_eq!(record.id, "p1");
        assert_eq!(record.updated_at, 0);
        assert!(record.pending_tasks.is_empty());
        assert!(record.attached_files.is_empty());
        assert_eq!(record.drive_folder_id, None);
    }
}
