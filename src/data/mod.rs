//! Run persistence module
//!
//! Stores opportunities to Parquet and run metadata to a JSON-lines log

mod parquet;
mod sink;

pub use parquet::{opportunity_schema, ParquetOpportunitySink, ParquetReader, RUN_LOG_FILE};
pub use sink::{MemorySink, OpportunitySink, SinkError};
