//! # State Stores
//!
//! Keyed persistence for `FileSyncState`. The controller writes through a
//! store after every mutation and only treats the mutation as done once the
//! write succeeded.

use crate::json;
use crate::state::FileSyncState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stylesync_common::{SyncError, SyncResult, MAX_TREE_DEPTH};

pub trait StateStore: Send + Sync {
    /// State stored for `uri`, or a fresh default when nothing was saved
    fn load(&self, uri: &str) -> impl Future<Output = SyncResult<FileSyncState>> + Send;

    fn save(
        &self,
        uri: &str,
        state: &FileSyncState,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// Forget everything stored for `uri`. Clearing a missing record succeeds.
    fn clear(&self, uri: &str) -> impl Future<Output = SyncResult<()>> + Send;
}

#[derive(Serialize)]
struct RecordRef<'a> {
    uri: &'a str,
    state: &'a FileSyncState,
}

#[derive(Deserialize)]
struct Record {
    uri: String,
    #[serde(default)]
    state: FileSyncState,
}

/// One pretty-printed JSON record per synced file under `state_dir`.
///
/// Records are named after the crc32 of the file URI and carry the URI
/// itself, so a checksum collision is detected rather than silently loading
/// another file's links.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    state_dir: PathBuf,
}

impl JsonStateStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn record_path(&self, uri: &str) -> PathBuf {
        self.state_dir
            .join(format!("{:08x}.json", crc32fast::hash(uri.as_bytes())))
    }
}

impl StateStore for JsonStateStore {
    fn load(&self, uri: &str) -> impl Future<Output = SyncResult<FileSyncState>> + Send {
        let path = self.record_path(uri);
        let uri = uri.to_string();

        async move {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(FileSyncState::default())
                }
                Err(err) => return Err(SyncError::persistence_failed(err)),
            };

            let record = decode_record(&bytes)?;
            if record.uri != uri {
                tracing::warn!(
                    path = %path.display(),
                    stored = %record.uri,
                    requested = %uri,
                    "State record belongs to another file, starting fresh"
                );
                return Ok(FileSyncState::default());
            }

            Ok(record.state)
        }
    }

    fn save(
        &self,
        uri: &str,
        state: &FileSyncState,
    ) -> impl Future<Output = SyncResult<()>> + Send {
        let path = self.record_path(uri);
        let encoded = check_depth(state).and_then(|()| {
            serde_json::to_vec_pretty(&RecordRef { uri, state })
                .map_err(SyncError::persistence_failed)
        });

        async move {
            let bytes = encoded?;
            write_atomic(&path, &bytes)
                .await
                .map_err(SyncError::persistence_failed)?;

            tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved state record");
            Ok(())
        }
    }

    fn clear(&self, uri: &str) -> impl Future<Output = SyncResult<()>> + Send {
        let path = self.record_path(uri);

        async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(SyncError::persistence_failed(err)),
            }
        }
    }
}

fn decode_record(bytes: &[u8]) -> SyncResult<Record> {
    let record: Record = json::from_slice(bytes).map_err(SyncError::persistence_failed)?;
    check_depth(&record.state)?;
    Ok(record)
}

fn check_depth(state: &FileSyncState) -> SyncResult<()> {
    let depth = state.cache.document().map_or(0, |document| document.depth());
    if depth > MAX_TREE_DEPTH {
        return Err(SyncError::persistence_failed(format!(
            "design tree nests {depth} levels deep, the limit is {MAX_TREE_DEPTH}"
        )));
    }
    Ok(())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp = path.with_extension("json.tmp");
    tokio::fs::write(&temp, bytes).await?;
    tokio::fs::rename(&temp, path).await
}

/// In-memory store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    records: Arc<Mutex<HashMap<String, FileSyncState>>>,
    fail_writes: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` and `clear` fail until turned off again
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn get(&self, uri: &str) -> Option<FileSyncState> {
        self.lock().get(uri).cloned()
    }

    pub fn insert(&self, uri: impl Into<String>, state: FileSyncState) {
        self.lock().insert(uri.into(), state);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, FileSyncState>> {
        // A panic while holding the lock cannot leave a record half-written
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> SyncResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::persistence_failed("write rejected by store"));
        }
        Ok(())
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, uri: &str) -> impl Future<Output = SyncResult<FileSyncState>> + Send {
        let state = self.get(uri).unwrap_or_default();
        async move { Ok(state) }
    }

    fn save(
        &self,
        uri: &str,
        state: &FileSyncState,
    ) -> impl Future<Output = SyncResult<()>> + Send {
        let result = self.check_writable().map(|()| {
            self.lock().insert(uri.to_string(), state.clone());
            self.saves.fetch_add(1, Ordering::SeqCst);
        });
        async move { result }
    }

    fn clear(&self, uri: &str) -> impl Future<Output = SyncResult<()>> + Send {
        let result = self.check_writable().map(|()| {
            self.lock().remove(uri);
        });
        async move { result }
    }
}
