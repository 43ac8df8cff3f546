pub mod batch_upserter;
pub mod bulk_loader;
pub mod sql;

pub use batch_upserter::{run_in_waves, BatchUpserter, WaveSummary};
pub use bulk_loader::BulkLoader;
