use crate::error::Result;
use crate::models::Column;
use crate::readers::{Compression, DelimitedReader, ScanStats};
use crate::staging::StagingArea;
use crate::utils::constants::{DEFAULT_BUFFER_SIZE, STAGING_DELIMITER};
use csv::{QuoteStyle, WriterBuilder};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;

/// A bulk-load ready CSV artifact: header line in column order, one line per
/// accepted record. The file is deleted when this value drops.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    columns: &'static [Column],
    stats: ScanStats,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Source records observed, including rejected ones.
    pub fn row_count(&self) -> u64 {
        self.stats.observed
    }

    pub fn staged_rows(&self) -> u64 {
        self.stats.accepted
    }

    pub fn rejected_rows(&self) -> u64 {
        self.stats.rejected
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Delete now and report failures, instead of silently on drop.
    pub fn cleanup(self) -> Result<()> {
        self.path.close()?;
        Ok(())
    }
}

/// Decompress, parse, normalize and write one payload to the staging area.
#[derive(Clone)]
pub struct Stager {
    reader: DelimitedReader,
    area: Arc<StagingArea>,
}

impl Stager {
    pub fn new(reader: DelimitedReader, area: Arc<StagingArea>) -> Self {
        Self { reader, area }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.reader = self.reader.with_compression(compression);
        self
    }

    pub fn area(&self) -> &StagingArea {
        &self.area
    }

    /// Blocking; call through [`Stager::stage`] from async code.
    pub fn stage_bytes(&self, payload: &[u8]) -> Result<StagedFile> {
        let columns = self.reader.normalizer().schema().columns();
        let (file, path) = self.area.create_file()?.into_parts();

        let mut writer = WriterBuilder::new()
            .delimiter(STAGING_DELIMITER)
            .quote_style(QuoteStyle::Necessary)
            .buffer_capacity(DEFAULT_BUFFER_SIZE)
            .from_writer(file);
        writer.write_record(columns.iter().map(|c| c.name))?;

        // Null renders as an unquoted empty field, which COPY reads back as NULL.
        let stats = self.reader.for_each(payload, |record| {
            writer.write_record(record.values().iter().map(|v| v.to_string()))?;
            Ok(())
        })?;
        writer.flush()?;

        Ok(StagedFile {
            path,
            columns,
            stats,
        })
    }

    pub async fn stage(&self, payload: Vec<u8>) -> Result<StagedFile> {
        let stager = self.clone();
        tokio::task::spawn_blocking(move || stager.stage_bytes(&payload)).await?
    }
}
