pub mod catalog;
pub mod delimited;

pub use catalog::{select_urls, CatalogClient, FileSource};
pub use delimited::{decode_field, Compression, DelimitedReader, ScanStats};
