//! Opportunity sink seam

use crate::matcher::Opportunity;
use crate::scan::RunMetadata;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Failure persisting a run
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for a finished run's opportunities and metadata
#[async_trait]
pub trait OpportunitySink: Send + Sync {
    async fn record_run(
        &self,
        metadata: &RunMetadata,
        opportunities: &[Opportunity],
    ) -> Result<(), SinkError>;
}

/// Keeps runs in memory; used for dry runs
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    runs: Arc<Mutex<Vec<(RunMetadata, Vec<Opportunity>)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every run recorded so far
    pub async fn runs(&self) -> Vec<(RunMetadata, Vec<Opportunity>)> {
        self.runs.lock().await.clone()
    }
}

#[async_trait]
impl OpportunitySink for MemorySink {
    async fn record_run(
        &self,
        metadata: &RunMetadata,
        opportunities: &[Opportunity],
    ) -> Result<(), SinkError> {
        self.runs
            .lock()
            .await
            .push((metadata.clone(), opportunities.to_vec()));
        Ok(())
    }
}
