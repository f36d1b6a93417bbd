//! State ledger for provisioned resources
//!
//! Manages the `.stackflow/state.yaml` file which records every resource this
//! tool has created, keyed by resource type and identifier. The ledger is the
//! sole source of truth for reconciliation; it is never compared against the
//! live provider.

use crate::error::StateError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const STATE_DIR: &str = ".stackflow";
pub const STATE_FILE: &str = "state.yaml";
const BACKUP_SUFFIX: &str = "backup";
const TEMP_SUFFIX: &str = "tmp";

/// Resource type -> resource id -> metadata
pub type StateRecord = BTreeMap<String, BTreeMap<String, Value>>;

type Result<T> = std::result::Result<T, StateError>;

/// Durable ledger of completed resource creations
///
/// Every mutation rewrites the whole file (temp file + rename), so the file on
/// disk is always a complete snapshot. Mutations are serialized by an async
/// mutex held across mutate and persist, which keeps concurrent `record` calls
/// from losing each other's writes.
pub struct StateStore {
    path: PathBuf,
    read_only: bool,
    inner: Mutex<Inner>,
}

struct Inner {
    record: StateRecord,
    /// In-memory record differs from the last successful write
    dirty: bool,
}

impl StateStore {
    /// Default ledger location inside a project directory
    pub fn default_path(project_root: impl AsRef<Path>) -> PathBuf {
        project_root.as_ref().join(STATE_DIR).join(STATE_FILE)
    }

    /// Load the ledger, creating an empty one if the file does not exist
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        match read_record(&path).await? {
            Some(record) => {
                tracing::debug!(
                    "Loaded state with {} resources from {}",
                    count(&record),
                    path.display()
                );
                Ok(Self::with_record(path, record, false))
            }
            None => {
                tracing::debug!("State file not found, creating {}", path.display());
                let store = Self::with_record(path, StateRecord::new(), false);
                store.write_snapshot(&StateRecord::new()).await?;
                Ok(store)
            }
        }
    }

    /// Load the ledger for inspection only
    ///
    /// A missing file yields an empty store and is not created; `record` and
    /// `remove` are refused.
    pub async fn load_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let record = read_record(&path).await?.unwrap_or_default();
        Ok(Self::with_record(path, record, true))
    }

    fn with_record(path: PathBuf, record: StateRecord, read_only: bool) -> Self {
        Self {
            path,
            read_only,
            inner: Mutex::new(Inner {
                record,
                dirty: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// True iff an entry for exactly this (type, id) pair is present
    pub async fn exists(&self, resource_type: &str, resource_id: &str) -> bool {
        let inner = self.inner.lock().await;
        inner
            .record
            .get(resource_type)
            .is_some_and(|ids| ids.contains_key(resource_id))
    }

    /// Get the recorded metadata for a resource
    pub async fn get(&self, resource_type: &str, resource_id: &str) -> Option<Value> {
        let inner = self.inner.lock().await;
        inner
            .record
            .get(resource_type)
            .and_then(|ids| ids.get(resource_id))
            .cloned()
    }

    /// Insert or overwrite an entry, then persist the full ledger
    ///
    /// On a persistence failure the entry stays in memory and the store is
    /// marked dirty; the caller must treat the resource as unconfirmed.
    pub async fn record(&self, resource_type: &str, resource_id: &str, metadata: Value) -> Result<()> {
        self.ensure_writable()?;

        let mut inner = self.inner.lock().await;
        inner
            .record
            .entry(resource_type.to_string())
            .or_default()
            .insert(resource_id.to_string(), metadata);
        inner.dirty = true;

        self.persist_locked(&mut inner).await?;
        tracing::debug!("Recorded {}:{}", resource_type, resource_id);
        Ok(())
    }

    /// Delete an entry if present; no-op if absent
    pub async fn remove(&self, resource_type: &str, resource_id: &str) -> Result<()> {
        self.ensure_writable()?;

        let mut inner = self.inner.lock().await;
        let Some(ids) = inner.record.get_mut(resource_type) else {
            return Ok(());
        };
        if ids.remove(resource_id).is_none() {
            return Ok(());
        }
        if ids.is_empty() {
            inner.record.remove(resource_type);
        }
        inner.dirty = true;

        self.persist_locked(&mut inner).await?;
        tracing::debug!("Removed {}:{}", resource_type, resource_id);
        Ok(())
    }

    /// Persist any changes a previous write failed to store
    pub async fn flush(&self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }

        let mut inner = self.inner.lock().await;
        if !inner.dirty {
            return Ok(());
        }
        self.persist_locked(&mut inner).await
    }

    /// Copy of the current in-memory record
    pub async fn snapshot(&self) -> StateRecord {
        self.inner.lock().await.record.clone()
    }

    /// Total number of recorded resources
    pub async fn len(&self) -> usize {
        count(&self.inner.lock().await.record)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(StateError::ReadOnly(self.path.clone()));
        }
        Ok(())
    }

    async fn persist_locked(&self, inner: &mut Inner) -> Result<()> {
        self.write_snapshot(&inner.record).await?;
        inner.dirty = false;
        Ok(())
    }

    /// Write a full snapshot: temp file, backup of the previous ledger, rename
    async fn write_snapshot(&self, record: &StateRecord) -> Result<()> {
        let content =
            serde_yaml::to_string(record).map_err(|e| StateError::Serialize(e.to_string()))?;
        let persistence = |source| StateError::Persistence {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).await.map_err(persistence)?;
            }
        }

        let temp = sibling(&self.path, TEMP_SUFFIX);
        let mut file = fs::File::create(&temp).await.map_err(persistence)?;
        file.write_all(content.as_bytes())
            .await
            .map_err(persistence)?;
        file.sync_all().await.map_err(persistence)?;
        drop(file);

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            fs::copy(&self.path, sibling(&self.path, BACKUP_SUFFIX))
                .await
                .map_err(persistence)?;
        }

        fs::rename(&temp, &self.path).await.map_err(persistence)?;

        tracing::debug!("Saved state with {} resources", count(record));
        Ok(())
    }
}

/// Read and parse the ledger; `None` if the file does not exist
async fn read_record(path: &Path) -> Result<Option<StateRecord>> {
    match fs::read_to_string(path).await {
        Ok(content) => parse_record(&content, path).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StateError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse ledger content; empty content and `null` are the empty ledger
pub fn parse_record(content: &str, path: &Path) -> Result<StateRecord> {
    if content.trim().is_empty() {
        return Ok(StateRecord::new());
    }

    let raw: Option<BTreeMap<String, Option<BTreeMap<String, Value>>>> =
        serde_yaml::from_str(content).map_err(|e| StateError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(resource_type, ids)| (resource_type, ids.unwrap_or_default()))
        .collect())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn count(record: &StateRecord) -> usize {
    record.values().map(BTreeMap::len).sum()
}
