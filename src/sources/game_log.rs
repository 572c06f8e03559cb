//! Game-log backed stats source
//!
//! Each subject has one JSON file named after its slug holding a list of
//! games, each with a date and a map of statistic code to value.

use super::StatsSource;
use crate::cache::FetchError;
use crate::floor::{Stat, Subject};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One game in a subject's log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLogRecord {
    pub date: NaiveDate,
    pub stats: HashMap<String, Decimal>,
}

/// Reads per-subject game logs from a directory
#[derive(Debug, Clone)]
pub struct GameLogStatsSource {
    dir: PathBuf,
}

impl GameLogStatsSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for `subject`
    pub fn log_path(&self, subject: &Subject) -> PathBuf {
        self.dir.join(format!("{}.json", subject.slug()))
    }

    async fn read_log(&self, subject: &Subject) -> Result<Vec<GameLogRecord>, FetchError> {
        let path = self.log_path(subject);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound(subject.name.clone()));
            }
            Err(e) => return Err(FetchError::Network(format!("{}: {}", path.display(), e))),
        };

        Ok(serde_json::from_slice(&content)?)
    }
}

#[async_trait]
impl StatsSource for GameLogStatsSource {
    async fn fetch_series(
        &self,
        subject: &Subject,
        stat: Stat,
        lookback: usize,
    ) -> Result<Vec<Decimal>, FetchError> {
        let mut games = self.read_log(subject).await?;
        games.sort_by_key(|g| g.date);

        let key = stat.log_key();
        let values: Vec<Decimal> = games
            .iter()
            .filter_map(|g| g.stats.get(key).copied())
            .collect();

        if values.is_empty() {
            return Err(FetchError::NotFound(format!("{} {}", subject.name, stat)));
        }

        let skip = values.len().saturating_sub(lookback);
        tracing::trace!(subject = %subject, stat = %stat, games = values.len() - skip, "Loaded game log");
        Ok(values[skip..].to_vec())
    }
}
