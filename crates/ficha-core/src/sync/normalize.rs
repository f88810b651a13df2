//! Record normalization.
//!
//! Every record is normalized before it enters comparison, storage, or
//! merge logic, regardless of origin (fresh local create, remote feed,
//! legacy storage). Skipping it would break the signature module's
//! equality guarantee, so the reconciler applies it unconditionally.
//!
//! Defaults applied:
//! - `id` trimmed (blank ids are later dropped by the reconciler)
//! - `diagnosis`, `clinical_note` stay `""` when absent
//! - `drive_folder_id` blank → `None`
//! - tasks: text trimmed, blank tasks dropped, missing ids assigned
//!   `task-{index}`, completion fields cleared unless completed
//! - files: entries missing `id` or `name` dropped, display metadata
//!   blank → `None`, duplicate tags removed
//! - timestamps: negative → `0`

use crate::models::{AttachedFile, PatientRecord, PendingTask, SyncMeta};
use crate::sync::version::clamp_timestamp;

/// Normalize optional text by trimming whitespace and removing empties.
fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Apply structural defaults so the record compares and merges safely.
///
/// Idempotent: `normalize_record(normalize_record(r)) == normalize_record(r)`.
#[must_use]
pub fn normalize_record(record: PatientRecord) -> PatientRecord {
    PatientRecord {
        id: record.id.trim().to_string(),
        name: record.name,
        rut: record.rut,
        birth_date: record.birth_date,
        gender: record.gender,
        type_id: record.type_id,
        entry_time: normalize_text_option(record.entry_time),
        exit_time: normalize_text_option(record.exit_time),
        diagnosis: record.diagnosis,
        clinical_note: record.clinical_note,
        date: record.date,
        drive_folder_id: normalize_text_option(record.drive_folder_id),
        pending_tasks: normalize_tasks(record.pending_tasks),
        attached_files: normalize_files(record.attached_files),
        created_at: clamp_timestamp(record.created_at),
        updated_at: clamp_timestamp(record.updated_at),
        sync_meta: SyncMeta {
            updated_at: clamp_timestamp(record.sync_meta.updated_at),
        },
    }
}

/// Normalize a task list: trim text, drop blank tasks, assign positional
/// ids to tasks missing one.
///
/// The assigned id is `task-{index}` where index is the task's position in
/// the incoming list, so the same input always yields the same ids.
#[must_use]
pub fn normalize_tasks(tasks: Vec<PendingTask>) -> Vec<PendingTask> {
    tasks
        .into_iter()
        .enumerate()
        .filter_map(|(index, task)| normalize_task(task, index))
        .collect()
}

fn normalize_task(task: PendingTask, index: usize) -> Option<PendingTask> {
    let text = task.text.trim().to_string();
    if text.is_empty() {
        return None;
    }

    let id = task.id.trim().to_string();
    let id = if id.is_empty() {
        format!("task-{index}")
    } else {
        id
    };

    let completed_at = if task.is_completed {
        task.completed_at.map(clamp_timestamp)
    } else {
        None
    };
    let completion_note = if task.is_completed {
        normalize_text_option(task.completion_note)
    } else {
        None
    };

    Some(PendingTask {
        id,
        text,
        is_completed: task.is_completed,
        created_at: clamp_timestamp(task.created_at),
        completed_at,
        completion_note,
    })
}

/// Normalize a file list, dropping entries missing `id` or `name`.
#[must_use]
pub fn normalize_files(files: Vec<AttachedFile>) -> Vec<AttachedFile> {
    files.into_iter().filter_map(normalize_file).collect()
}

fn normalize_file(file: AttachedFile) -> Option<AttachedFile> {
    let id = file.id.trim().to_string();
    let name = file.name.trim().to_string();
    if id.is_empty() || name.is_empty() {
        return None;
    }

    let mut tags: Vec<String> = Vec::with_capacity(file.tags.len());
    for tag in file.tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    Some(AttachedFile {
        id,
        name,
        mime_type: file.mime_type,
        size: file.size.max(0),
        uploaded_at: clamp_timestamp(file.uploaded_at),
        drive_url: file.drive_url,
        custom_title: normalize_text_option(file.custom_title),
        custom_type_label: normalize_text_option(file.custom_type_label),
        note_date: normalize_text_option(file.note_date),
        category: normalize_text_option(file.category),
        is_starred: file.is_starred,
        description: normalize_text_option(file.description),
        tags,
    })
}
