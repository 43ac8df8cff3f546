use crate::error::{ProcessingError, Result};
use crate::utils::constants::STAGING_FILE_PREFIX;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile, TempDir};

/// Directory holding staging artifacts for one run.
///
/// Every artifact is a `NamedTempFile`, removed when its handle drops; an
/// area created with [`StagingArea::new`] also removes its directory.
pub struct StagingArea {
    root: PathBuf,
    temp_dir: Option<TempDir>,
}

impl StagingArea {
    pub fn new() -> Result<Self> {
        let temp_dir = Builder::new().prefix(STAGING_FILE_PREFIX).tempdir().map_err(|e| {
            ProcessingError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create staging directory: {}", e),
            ))
        })?;

        Ok(Self {
            root: temp_dir.path().to_path_buf(),
            temp_dir: Some(temp_dir),
        })
    }

    /// Use a caller-owned directory, created if missing and left in place.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let root = dir.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            temp_dir: None,
        })
    }

    pub fn from_config(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::in_dir(dir),
            None => Self::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn create_file(&self) -> Result<NamedTempFile> {
        Ok(Builder::new()
            .prefix(STAGING_FILE_PREFIX)
            .suffix(".csv")
            .tempfile_in(&self.root)?)
    }

    /// Staging artifacts currently on disk.
    pub fn pending_files(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(STAGING_FILE_PREFIX) && entry.path().is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}
