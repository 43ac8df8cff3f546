pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod schema;
pub mod staging;
pub mod utils;
pub mod writers;

pub use crate::config::IngestConfig;
pub use error::{ProcessingError, Result};
pub use models::{CanonicalRecord, FileReport, FileStatus, RunReport, Value};
pub use processors::{IngestPipeline, MergeTarget, RecordNormalizer, RecordSink};
pub use schema::{DatasetKind, DatasetSchema};
