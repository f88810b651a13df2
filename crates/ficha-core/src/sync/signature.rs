//! Content and sync-state signatures.
//!
//! Signatures let the merge path test equality without deep structural
//! comparison. The canonical form is a `serde_json::Value` object rendered
//! to a string: object keys are backed by a `BTreeMap`, so key order is
//! sorted and stable regardless of construction order, and records are
//! normalized first so omitted-vs-null optional fields collapse to one
//! shape.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::models::{AttachedFile, PatientRecord, PendingTask};
use crate::sync::normalize::normalize_record;
use crate::sync::version::VersionVector;

/// Signature of a record's content fields, excluding all version fields.
///
/// Two records are content-equal iff their data signatures are equal.
#[must_use]
pub fn data_signature(record: &PatientRecord) -> String {
    let record = normalize_record(record.clone());
    json!({
        "id": record.id,
        "name": record.name,
        "rut": record.rut,
        "birthDate": record.birth_date,
        "gender": record.gender,
        "typeId": record.type_id,
        "entryTime": record.entry_time,
        "exitTime": record.exit_time,
        "diagnosis": record.diagnosis,
        "clinicalNote": record.clinical_note,
        "date": record.date,
        "driveFolderId": record.drive_folder_id,
        "pendingTasks": record.pending_tasks.iter().map(task_value).collect::<Vec<_>>(),
        "attachedFiles": record.attached_files.iter().map(file_value).collect::<Vec<_>>(),
    })
    .to_string()
}

/// Signature of a record's full sync state: version vector plus content.
///
/// Two records are equivalent iff these match.
#[must_use]
pub fn sync_state_signature(record: &PatientRecord) -> String {
    let version = VersionVector::of(record);
    format!(
        "{}.{}.{}|{}",
        version.updated_at,
        version.sync_updated_at,
        version.created_at,
        data_signature(record)
    )
}

/// Public equality test used by the orchestrator to short-circuit no-op
/// merges.
#[must_use]
pub fn records_equivalent(a: &PatientRecord, b: &PatientRecord) -> bool {
    sync_state_signature(a) == sync_state_signature(b)
}

/// SHA-256 hex digest over a collection's per-record sync-state
/// signatures, in id-sorted order so input ordering never changes the
/// hash. Backs the idempotent-remote-write short-circuit.
#[must_use]
pub fn collection_state_hash(records: &[PatientRecord]) -> String {
    let mut signatures: Vec<String> = records.iter().map(sync_state_signature).collect();
    signatures.sort_unstable();

    let mut hasher = Sha256::new();
    for signature in &signatures {
        hasher.update(signature.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

fn task_value(task: &PendingTask) -> Value {
    json!({
        "id": task.id,
        "text": task.text,
        "isCompleted": task.is_completed,
        "createdAt": task.created_at,
        "completedAt": task.completed_at,
        "completionNote": task.completion_note,
    })
}

fn file_value(file: &AttachedFile) -> Value {
    json!({
        "id": file.id,
        "name": file.name,
        "mimeType": file.mime_type,
        "size": file.size,
        "uploadedAt": file.uploaded_at,
        "driveUrl": file.drive_url,
        "customTitle": file.custom_title,
        "customTypeLabel": file.custom_type_label,
        "noteDate": file.note_date,
        "category": file.category,
        "isStarred": file.is_starred,
        "description": file.description,
        "tags": file.tags,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::SyncMeta;

    fn record(diagnosis: &str, updated_at: i64) -> PatientRecord {
        PatientRecord {
            id: "p1".to_string(),
            name: "Ana Rojas".to_string(),
            diagnosis: diagnosis.to_string(),
            updated_at,
            ..PatientRecord::default()
        }
    }

    #[test]
    fn test_data_signature_ignores_version_fields() {
        let a = record("preeclampsia", 10);
        let mut b = record("preeclampsia", 99);
        b.created_at = 5;
        b.sync_meta = SyncMeta { updated_at: 42 };
        assert_eq!(data_signature(&a), data_signature(&b));
    }

    #[test]
    fn test_data_signature_detects_content_change() {
        assert_ne!(
            data_signature(&record("preeclampsia", 10)),
            data_signature(&record("colestasia", 10))
        );
    }

    #[test]
    fn test_signature_collapses_omitted_and_blank_optionals() {
        let mut a = record("x", 10);
        a.drive_folder_id = None;
        let mut b = record("x", 10);
        b.drive_folder_id = Some("   ".to_string());
        assert_eq!(data_signature(&a), data_signature(&b));
    }

    #[test]
    fn test_equivalence_requires_matching_version() {
        let a = record("x", 10);
        let b = record("x", 20);
        assert!(!records_equivalent(&a, &b));
        assert!(records_equivalent(&a, &a.clone()));
    }

    #[test]
    fn test_collection_hash_is_order_independent() {
        let a = record("x", 10);
        let mut b = record("y", 10);
        b.id = "p2".to_string();
        assert_eq!(
            collection_state_hash(&[a.clone(), b.clone()]),
            collection_state_hash(&[b, a])
        );
    }

    #[test]
    fn test_collection_hash_changes_with_content() {
        let a = record("x", 10);
        let b = record("y", 10);
        assert_ne!(collection_state_hash(&[a]), collection_state_hash(&[b]));
    }

    #[test]
    fn test_signature_is_stable_across_calls() {
        let a = record("x", 10);
        assert_eq!(sync_state_signature(&a), sync_state_signature(&a));
    }
}
