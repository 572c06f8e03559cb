//! Scan run types

use crate::cache::{FetchError, FetchMode};
use crate::data::SinkError;
use crate::floor::SubjectKind;
use crate::matcher::{Opportunity, SkipCounters};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;
use uuid::Uuid;

/// Scan failure; the run is not recorded and may be retried
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] SinkError),
}

/// Summary record persisted alongside each run's opportunities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub scan_date: NaiveDate,
    pub fetch_mode: FetchMode,
    /// Subject/statistic/side groups evaluated
    pub subjects_analyzed: usize,
    /// Groups that produced no opportunity
    pub subjects_skipped: usize,
    pub opportunities: usize,
    pub player_picks: usize,
    pub team_picks: usize,
    pub skips: SkipCounters,
    /// Last known remaining request budget
    pub quota_remaining: Option<u32>,
    pub events_scanned: usize,
    pub events_with_lines: usize,
    pub first_event_start: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunMetadata {
    /// Wall-clock time the scan took
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Result of one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub metadata: RunMetadata,
    /// Emitted opportunities, best price first
    pub opportunities: Vec<Opportunity>,
}

impl RunSummary {
    pub fn run_id(&self) -> Uuid {
        self.metadata.run_id
    }

    /// Opportunities for one subject kind
    pub fn picks(&self, kind: SubjectKind) -> impl Iterator<Item = &Opportunity> {
        self.opportunities.iter().filter(move |o| o.subject_kind() == kind)
    }

    /// Format as a table for display
    pub fn format_table(&self) -> String {
        let m = &self.metadata;
        let mut out = format!(
            r#"
══════════════════════════════════════════════════════
               SCAN RESULTS {}
══════════════════════════════════════════════════════

RUN
───────────────────────────────────────────────────────
Run ID:           {}
Fetch Mode:       {:?}
Events:           {} ({} with lines)
Quota Remaining:  {}
Duration:         {}ms

ANALYSIS
───────────────────────────────────────────────────────
Analyzed:         {}
Skipped:          {}
  No Line:        {}
  Price:          {}
  Sample:         {}
  No History:     {}
  Invalid Series: {}
Malformed Lines:  {}

OPPORTUNITIES     {} ({} player, {} team)
───────────────────────────────────────────────────────
"#,
            m.scan_date,
            m.run_id,
            m.fetch_mode,
            m.events_scanned,
            m.events_with_lines,
            m.quota_remaining
                .map(|q| q.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            m.duration().num_milliseconds(),
            m.subjects_analyzed,
            m.subjects_skipped,
            m.skips.no_qualifying_line,
            m.skips.price_rejected,
            m.skips.insufficient_sample,
            m.skips.no_history,
            m.skips.invalid_series,
            m.skips.malformed_lines,
            m.opportunities,
            m.player_picks,
            m.team_picks,
        );

        for o in &self.opportunities {
            let _ = writeln!(
                out,
                "{:<24} {:<8} {:<5} {:>6} {:>6}  {:?} {}  hit {}",
                o.subject.name,
                o.stat.code(),
                o.side.to_string(),
                o.line.to_string(),
                o.price.to_string(),
                o.bound,
                o.bound_value,
                o.hit_rate(),
            );
        }
        out.push_str("══════════════════════════════════════════════════════\n");
        out
    }
}
