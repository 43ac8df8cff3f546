pub mod area;
pub mod stager;

pub use area::StagingArea;
pub use stager::{StagedFile, Stager};
