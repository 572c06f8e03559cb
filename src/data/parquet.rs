//! Parquet opportunity sink
//!
//! One Parquet file per run plus a JSON-lines log of run metadata

use super::{OpportunitySink, SinkError};
use crate::floor::{BoundKind, Stat, Subject, SubjectKind};
use crate::lines::{AmericanOdds, Side};
use crate::matcher::{Opportunity, ToleranceBand};
use crate::scan::RunMetadata;
use arrow::array::{
    Array, ArrayRef, Int32Array, StringArray, TimestampMicrosecondArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::DateTime;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Run metadata log file name
pub const RUN_LOG_FILE: &str = "runs.jsonl";

/// Opportunity schema fields
pub fn opportunity_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("id", DataType::Utf8, false),
        Field::new("run_id", DataType::Utf8, false),
        Field::new("subject", DataType::Utf8, false),
        Field::new("subject_kind", DataType::Utf8, false),
        Field::new("stat", DataType::Utf8, false),
        Field::new("side", DataType::Utf8, false),
        Field::new("line", DataType::Utf8, false), // Store as string for Decimal precision
        Field::new("price", DataType::Int32, false),
        Field::new("bound", DataType::Utf8, false),
        Field::new("bound_value", DataType::Utf8, false),
        Field::new("raw_percentile", DataType::Utf8, false),
        Field::new("sample_size", DataType::UInt32, false),
        Field::new("hit_count", DataType::UInt32, false),
        Field::new("recent", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("event_id", DataType::Utf8, false),
        Field::new("band_lower", DataType::Utf8, false),
        Field::new("band_upper", DataType::Utf8, false),
    ])
}

/// Writes each run's opportunities to Parquet under one directory
#[derive(Debug, Clone)]
pub struct ParquetOpportunitySink {
    output_dir: PathBuf,
}

impl ParquetOpportunitySink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Ensure output directory exists
    pub fn ensure_dir(&self) -> Result<(), SinkError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// File path for a run's opportunities
    pub fn file_path(&self, metadata: &RunMetadata) -> PathBuf {
        let filename = format!(
            "opportunities_{}_{}.parquet",
            metadata.scan_date.format("%Y%m%d"),
            metadata.run_id.simple()
        );
        self.output_dir.join(filename)
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.output_dir.join(RUN_LOG_FILE)
    }

    /// Write opportunities to a Parquet file
    pub fn write_opportunities(
        &self,
        path: &Path,
        run_id: Uuid,
        opportunities: &[Opportunity],
    ) -> Result<(), SinkError> {
        if opportunities.is_empty() {
            return Ok(());
        }

        self.ensure_dir()?;

        let schema = Arc::new(opportunity_schema());
        let file = File::create(path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let strings = |f: &dyn Fn(&Opportunity) -> String| -> ArrayRef {
            Arc::new(StringArray::from(
                opportunities.iter().map(f).collect::<Vec<_>>(),
            ))
        };

        let timestamps: Vec<i64> = opportunities
            .iter()
            .map(|o| o.timestamp.timestamp_micros())
            .collect();
        let prices: Vec<i32> = opportunities.iter().map(|o| o.price.value()).collect();
        let sample_sizes: Vec<u32> = opportunities.iter().map(|o| o.sample_size as u32).collect();
        let hit_counts: Vec<u32> = opportunities.iter().map(|o| o.hit_count as u32).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC"))
                    as ArrayRef,
                strings(&|o| o.id.to_string()),
                strings(&|_| run_id.to_string()),
                strings(&|o| o.subject.name.clone()),
                strings(&|o| subject_kind_label(o.subject.kind).to_string()),
                strings(&|o| o.stat.code().to_string()),
                strings(&|o| side_label(o.side).to_string()),
                strings(&|o| o.line.to_string()),
                Arc::new(Int32Array::from(prices)) as ArrayRef,
                strings(&|o| bound_label(o.bound).to_string()),
                strings(&|o| o.bound_value.to_string()),
                strings(&|o| o.raw_percentile.to_string()),
                Arc::new(UInt32Array::from(sample_sizes)) as ArrayRef,
                Arc::new(UInt32Array::from(hit_counts)) as ArrayRef,
                strings(&|o| {
                    o.recent
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                }),
                strings(&|o| o.source.clone()),
                strings(&|o| o.event_id.clone()),
                strings(&|o| o.band.lower.to_string()),
                strings(&|o| o.band.upper.to_string()),
            ],
        )?;

        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, count = opportunities.len(), "Wrote opportunities to Parquet");

        Ok(())
    }

    /// Append one run's metadata to the run log
    pub fn append_run(&self, metadata: &RunMetadata) -> Result<(), SinkError> {
        self.ensure_dir()?;

        let mut line = serde_json::to_string(metadata)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.run_log_path())?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Every run logged so far, oldest first
    pub fn run_history(&self) -> Result<Vec<RunMetadata>, SinkError> {
        let path = self.run_log_path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut runs = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            runs.push(serde_json::from_str(&line)?);
        }
        Ok(runs)
    }
}

#[async_trait]
impl OpportunitySink for ParquetOpportunitySink {
    async fn record_run(
        &self,
        metadata: &RunMetadata,
        opportunities: &[Opportunity],
    ) -> Result<(), SinkError> {
        let path = self.file_path(metadata);
        self.write_opportunities(&path, metadata.run_id, opportunities)?;
        self.append_run(metadata)?;

        tracing::info!(
            run_id = %metadata.run_id,
            opportunities = opportunities.len(),
            output_dir = ?self.output_dir,
            "Recorded run"
        );
        Ok(())
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Over => "over",
        Side::Under => "under",
    }
}

fn bound_label(bound: BoundKind) -> &'static str {
    match bound {
        BoundKind::Floor => "floor",
        BoundKind::Ceiling => "ceiling",
    }
}

fn subject_kind_label(kind: SubjectKind) -> &'static str {
    match kind {
        SubjectKind::Player => "player",
        SubjectKind::Team => "team",
    }
}

/// Reader for opportunity Parquet files
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    /// Create a new reader for a Parquet file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read opportunities from a Parquet file
    pub fn read_opportunities(&self) -> anyhow::Result<Vec<Opportunity>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(&self.path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let reader = builder.build()?;

        let mut opportunities = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;

            let timestamps = column::<TimestampMicrosecondArray>(&batch, "timestamp")?;
            let prices = column::<Int32Array>(&batch, "price")?;
            let sample_sizes = column::<UInt32Array>(&batch, "sample_size")?;
            let hit_counts = column::<UInt32Array>(&batch, "hit_count")?;
            let text = |name: &str| column::<StringArray>(&batch, name);

            let (ids, subjects, kinds, stats) =
                (text("id")?, text("subject")?, text("subject_kind")?, text("stat")?);
            let (sides, lines, bounds, bound_values) =
                (text("side")?, text("line")?, text("bound")?, text("bound_value")?);
            let (raw, recent, sources, events) =
                (text("raw_percentile")?, text("recent")?, text("source")?, text("event_id")?);
            let (band_lower, band_upper) = (text("band_lower")?, text("band_upper")?);

            for i in 0..batch.num_rows() {
                let timestamp = DateTime::from_timestamp_micros(timestamps.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?;
                let name = subjects.value(i);
                let subject = match kinds.value(i) {
                    "team" => Subject::team(name),
                    _ => Subject::player(name),
                };
                let stat = Stat::from_code(stats.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Unknown stat {}", stats.value(i)))?;
                let side = match sides.value(i) {
                    "under" => Side::Under,
                    _ => Side::Over,
                };
                let bound = match bounds.value(i) {
                    "ceiling" => BoundKind::Ceiling,
                    _ => BoundKind::Floor,
                };
                let recent_values = recent
                    .value(i)
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(Decimal::from_str)
                    .collect::<Result<Vec<_>, _>>()?;

                opportunities.push(Opportunity {
                    id: Uuid::parse_str(ids.value(i))?,
                    subject,
                    stat,
                    side,
                    line: Decimal::from_str(lines.value(i))?,
                    price: AmericanOdds::new(prices.value(i)),
                    bound,
                    bound_value: Decimal::from_str(bound_values.value(i))?,
                    raw_percentile: Decimal::from_str(raw.value(i))?,
                    sample_size: sample_sizes.value(i) as usize,
                    recent: recent_values,
                    hit_count: hit_counts.value(i) as usize,
                    source: sources.value(i).to_string(),
                    event_id: events.value(i).to_string(),
                    band: ToleranceBand {
                        lower: Decimal::from_str(band_lower.value(i))?,
                        upper: Decimal::from_str(band_upper.value(i))?,
                    },
                    timestamp,
                });
            }
        }

        Ok(opportunities)
    }

    /// Get the file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow::anyhow!("Invalid {} column", name))
}
