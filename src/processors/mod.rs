pub mod normalizer;
pub mod pipeline;

pub use normalizer::{HeaderIndex, IndexedRow, RecordNormalizer};
pub use pipeline::{required_period, IngestPipeline, MergeTarget, RecordSink};
