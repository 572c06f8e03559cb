//! Cache-or-fetch wrapper with quota accounting

use super::{FetchError, FetchMode, Fetched, QuotaStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry<V> {
    value: V,
    fetched_on: NaiveDate,
    run_id: Uuid,
}

#[derive(Serialize, Deserialize)]
struct Snapshot<K, V> {
    saved_at: DateTime<Utc>,
    quota_remaining: Option<u32>,
    entries: Vec<(K, CacheEntry<V>)>,
}

/// Mediates access to a metered data source.
///
/// Each entry remembers the calendar day and the run that fetched it. The
/// caller chooses per call whether entries from earlier runs may be reused;
/// entries from another day are never reused. Live-fetch failures always
/// propagate and are never masked by an older entry.
#[derive(Debug)]
pub struct QuotaAwareFetchCache<K, V> {
    run_id: Uuid,
    entries: HashMap<K, CacheEntry<V>>,
    quota: QuotaStatus,
}

impl<K, V> Default for QuotaAwareFetchCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> QuotaAwareFetchCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Create an empty cache for a new run
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            entries: HashMap::new(),
            quota: QuotaStatus::default(),
        }
    }

    /// Identifier of the run this cache instance serves
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Start a new run; entries fetched so far belong to earlier runs.
    ///
    /// An exhausted budget seen by an earlier run no longer blocks live
    /// fetches; the provider's next answer decides.
    pub fn begin_run(&mut self) -> Uuid {
        self.run_id = Uuid::new_v4();
        self.quota.reopen();
        self.run_id
    }

    /// Current quota accounting
    pub fn quota(&self) -> QuotaStatus {
        self.quota
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached value for `key` if `mode` allows reusing it today
    pub fn lookup(&self, key: &K, mode: FetchMode, today: NaiveDate) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| self.reusable(entry, mode, today))
            .map(|entry| &entry.value)
    }

    fn reusable(&self, entry: &CacheEntry<V>, mode: FetchMode, today: NaiveDate) -> bool {
        if entry.fetched_on != today {
            return false;
        }
        match mode {
            FetchMode::Fresh => entry.run_id == self.run_id,
            FetchMode::Cached => true,
        }
    }

    /// Return the value for `key`, from cache when `mode` allows, else live.
    ///
    /// A successful live fetch is charged against the quota and stored. A
    /// failed one is recorded without a charge and returned to the caller.
    /// Once the budget is known to be spent no live fetch is attempted.
    pub async fn get_or_fetch<F, Fut>(
        &mut self,
        key: K,
        mode: FetchMode,
        today: NaiveDate,
        fetch: F,
    ) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Fetched<V>, FetchError>>,
    {
        if let Some(value) = self.lookup(&key, mode, today).cloned() {
            self.quota.hits += 1;
            tracing::debug!(?key, ?mode, "Serving from fetch cache");
            return Ok(value);
        }

        if self.quota.exhausted() {
            tracing::warn!(?key, "Refusing live fetch, quota exhausted");
            return Err(FetchError::QuotaExhausted);
        }

        match fetch().await {
            Ok(fetched) => {
                self.quota.charge(fetched.remaining_quota);
                tracing::debug!(
                    ?key,
                    remaining = ?self.quota.remaining,
                    "Live fetch complete"
                );
                self.entries.insert(
                    key,
                    CacheEntry {
                        value: fetched.value.clone(),
                        fetched_on: today,
                        run_id: self.run_id,
                    },
                );
                Ok(fetched.value)
            }
            Err(err) => {
                self.quota.fail(&err);
                tracing::warn!(?key, error = %err, "Live fetch failed");
                Err(err)
            }
        }
    }

    /// Drop entries fetched before `today`
    pub fn purge_before(&mut self, today: NaiveDate) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.fetched_on >= today);
        before - self.entries.len()
    }
}

impl<K, V> QuotaAwareFetchCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    /// Persist entries and the last known quota for later local runs
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let snapshot = Snapshot {
            saved_at: Utc::now(),
            quota_remaining: self.quota.remaining,
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        std::fs::write(path, serde_json::to_vec_pretty(&snapshot)?)?;

        tracing::debug!(path = ?path, entries = self.entries.len(), "Saved fetch cache snapshot");
        Ok(())
    }

    /// Restore a snapshot into a cache for a new run.
    ///
    /// Restored entries keep the run id that fetched them, so only
    /// `FetchMode::Cached` calls can reuse them. The saved remaining count is
    /// restored for reporting and never refuses a fetch on its own.
    pub fn load_snapshot(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read(path.as_ref())?;
        let snapshot: Snapshot<K, V> = serde_json::from_slice(&content)?;

        let mut cache = Self::new();
        cache.quota.remaining = snapshot.quota_remaining;
        cache.entries = snapshot.entries.into_iter().collect();

        tracing::debug!(
            saved_at = %snapshot.saved_at,
            entries = cache.entries.len(),
            "Loaded fetch cache snapshot"
        );
        Ok(cache)
    }
}
