//! Run state persistence

use super::RunState;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

/// Failure reading or writing run state
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keyed store of per-day run markers
#[async_trait]
pub trait RunStateStore: Send + Sync {
    /// Marker for `date`, if any
    async fn load(&self, date: NaiveDate) -> Result<Option<RunState>, StoreError>;

    /// Persist a completed run
    async fn mark_ran(&self, state: RunState) -> Result<(), StoreError>;

    /// Remove the marker for `date`; returns whether one existed
    async fn clear(&self, date: NaiveDate) -> Result<bool, StoreError>;

    /// Whether `date` has already run
    async fn has_run(&self, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.load(date).await?.is_some_and(|s| s.has_run))
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct InMemoryRunStateStore {
    states: RwLock<BTreeMap<NaiveDate, RunState>>,
}

impl InMemoryRunStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStateStore for InMemoryRunStateStore {
    async fn load(&self, date: NaiveDate) -> Result<Option<RunState>, StoreError> {
        Ok(self.states.read().await.get(&date).cloned())
    }

    async fn mark_ran(&self, state: RunState) -> Result<(), StoreError> {
        self.states.write().await.insert(state.date, state);
        Ok(())
    }

    async fn clear(&self, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.states.write().await.remove(&date).is_some())
    }
}

/// Store backed by one JSON file holding every day's marker.
///
/// Each write replaces the whole file through a temporary file and rename.
/// Concurrent writers are not coordinated; the last one wins.
#[derive(Debug, Clone)]
pub struct JsonRunStateStore {
    path: PathBuf,
}

impl JsonRunStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored marker, oldest first
    pub async fn all(&self) -> Result<BTreeMap<NaiveDate, RunState>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(content) if content.is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, states: &BTreeMap<NaiveDate, RunState>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(states)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RunStateStore for JsonRunStateStore {
    async fn load(&self, date: NaiveDate) -> Result<Option<RunState>, StoreError> {
        Ok(self.all().await?.remove(&date))
    }

    async fn mark_ran(&self, state: RunState) -> Result<(), StoreError> {
        let mut states = self.all().await?;
        tracing::debug!(date = %state.date, path = ?self.path, "Marking day as run");
        states.insert(state.date, state);
        self.write_all(&states).await
    }

    async fn clear(&self, date: NaiveDate) -> Result<bool, StoreError> {
        let mut states = self.all().await?;
        let existed = states.remove(&date).is_some();
        if existed {
            self.write_all(&states).await?;
        }
        Ok(existed)
    }
}
