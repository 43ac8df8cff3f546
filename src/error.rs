use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} while fetching {url}")]
    Http { url: String, status: u16 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Run-level failures abort the whole run; everything else is contained
    /// to the file or batch that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProcessingError::Catalog(_)
                | ProcessingError::Config(_)
                | ProcessingError::ConfigSource(_)
                | ProcessingError::Validation(_)
        )
    }
}
