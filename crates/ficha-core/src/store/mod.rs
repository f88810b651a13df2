//! Store collaborator contracts.
//!
//! The sync core never talks to persistence directly; it consumes these
//! narrow load/save contracts. Production adapters (key-value persistence,
//! the multi-device remote store) live in the app shell. The in-memory
//! implementations here back the test suite and double as reference
//! behavior for adapter authors.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::PatientRecord;

/// Local persistent store: must preserve whatever is written verbatim
/// until the next write.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn load_records(&self) -> Result<Vec<PatientRecord>>;
    async fn save_records(&self, records: &[PatientRecord]) -> Result<()>;
}

/// Remote multi-device store.
///
/// Writes must be idempotent: implementations receive the collection's
/// state hash and may treat a push carrying an already-accepted hash as a
/// safe no-op.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn push_records(&self, records: &[PatientRecord], state_hash: &str) -> Result<()>;
    async fn delete_record(&self, id: &str) -> Result<()>;
}

/// In-memory local store.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    records: Mutex<Vec<PatientRecord>>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(records: Vec<PatientRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Snapshot of the current contents, for assertions.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PatientRecord> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn load_records(&self) -> Result<Vec<PatientRecord>> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|_| Error::LocalStore("records lock poisoned".to_string()))
    }

    async fn save_records(&self, records: &[PatientRecord]) -> Result<()> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| Error::LocalStore("records lock poisoned".to_string()))?;
        *guard = records.to_vec();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryRemoteState {
    records: Vec<PatientRecord>,
    last_state_hash: Option<String>,
    push_count: usize,
    deleted_ids: Vec<String>,
    failures_remaining: u32,
}

/// In-memory remote store with failure injection for orchestrator tests.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    state: Mutex<MemoryRemoteState>,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` push/delete calls fail with a remote error.
    pub fn fail_next(&self, count: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.failures_remaining = count;
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<PatientRecord> {
        self.state
            .lock()
            .map(|state| state.records.clone())
            .unwrap_or_default()
    }

    /// Number of pushes that actually wrote (state hash changed).
    #[must_use]
    pub fn push_count(&self) -> usize {
        self.state.lock().map(|state| state.push_count).unwrap_or(0)
    }

    #[must_use]
    pub fn deleted_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.deleted_ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn push_records(&self, records: &[PatientRecord], state_hash: &str) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::RemoteStore("state lock poisoned".to_string()))?;
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(Error::RemoteStore("injected push failure".to_string()));
        }
        // Idempotent write: same state hash is a no-op.
        if state.last_state_hash.as_deref() == Some(state_hash) {
            return Ok(());
        }
        state.records = records.to_vec();
        state.last_state_hash = Some(state_hash.to_string());
        state.push_count += 1;
        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::RemoteStore("state lock poisoned".to_string()))?;
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(Error::RemoteStore("injected delete failure".to_string()));
        }
        state.records.retain(|record| record.id != id);
        state.deleted_ids.push(id.to_string());
        // The collection changed outside a push; force the next push
        // through the hash short-circuit.
        state.last_state_hash = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(id: &str) -> PatientRecord {
        PatientRecord {
            id: id.to_string(),
            ..PatientRecord::default()
        }
    }

    #[tokio::test]
    async fn test_local_store_round_trip() {
        let store = MemoryLocalStore::new();
        store.save_records(&[record("p1")]).await.unwrap();
        let loaded = store.load_records().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "p1");
    }

    #[tokio::test]
    async fn test_remote_push_short_circuits_on_same_hash() {
        let store = MemoryRemoteStore::new();
        store.push_records(&[record("p1")], "hash-a").await.unwrap();
        store.push_records(&[record("p1")], "hash-a").await.unwrap();
        assert_eq!(store.push_count(), 1);

        store.push_records(&[record("p1")], "hash-b").await.unwrap();
        assert_eq!(store.push_count(), 2);
    }

    #[tokio::test]
    async fn test_remote_failure_injection() {
        let store = MemoryRemoteStore::new();
        store.fail_next(1);
        assert!(store.push_records(&[], "h").await.is_err());
        assert!(store.push_records(&[], "h").await.is_ok());
    }

    #[tokio::test]
    async fn test_remote_delete_removes_record() {
        let store = MemoryRemoteStore::new();
        store
            .push_records(&[record("p1"), record("p2")], "h")
            .await
            .unwrap();
        store.delete_record("p1").await.unwrap();
        let remaining = store.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "p2");
        assert_eq!(store.deleted_ids(), vec!["p1".to_string()]);
    }
}
