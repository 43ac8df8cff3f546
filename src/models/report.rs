use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Error,
}

/// Outcome of one source file. `error` is only present on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub url: String,
    pub inserted: u64,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl FileReport {
    pub fn success(url: impl Into<String>, inserted: u64) -> Self {
        Self {
            url: url.into(),
            inserted,
            status: FileStatus::Success,
            error: None,
        }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            inserted: 0,
            status: FileStatus::Error,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// Structured summary returned to whatever triggered the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub request_id: String,
    pub success: bool,
    pub message: String,
    pub total_files: usize,
    pub processed_files: Vec<FileReport>,
    pub total_inserted: u64,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl RunReport {
    pub fn completed(
        request_id: impl Into<String>,
        message: impl Into<String>,
        processed_files: Vec<FileReport>,
        elapsed: Duration,
    ) -> Self {
        let total_inserted = processed_files.iter().map(|f| f.inserted).sum();
        Self {
            request_id: request_id.into(),
            success: true,
            message: message.into(),
            total_files: processed_files.len(),
            processed_files,
            total_inserted,
            duration_seconds: round_seconds(elapsed),
            error: None,
        }
    }

    /// Run-level failure: no partial per-file report is attempted.
    pub fn failed(request_id: impl Into<String>, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            message: "Run aborted".to_string(),
            total_files: 0,
            processed_files: Vec::new(),
            total_inserted: 0,
            duration_seconds: round_seconds(elapsed),
            error: Some(error.into()),
        }
    }

    pub fn failed_files(&self) -> usize {
        self.processed_files.iter().filter(|f| !f.is_success()).count()
    }

    pub fn summary(&self) -> String {
        if !self.success {
            return format!(
                "Run {} failed: {}",
                self.request_id,
                self.error.as_deref().unwrap_or("unknown error")
            );
        }
        format!(
            "Run {}: {} files ({} failed), {} rows merged in {:.2}s",
            self.request_id,
            self.total_files,
            self.failed_files(),
            self.total_inserted,
            self.duration_seconds
        )
    }
}

fn round_seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
