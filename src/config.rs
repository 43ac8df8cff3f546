use crate::error::{ProcessingError, Result};
use crate::utils::constants::*;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

/// Runtime settings, layered from lowest to highest precedence: built-in
/// defaults, a TOML file, `METEO_*` variables, then the well-known
/// `DATABASE_URL` and `POSTES_CSV_URL`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestConfig {
    pub database_url: Option<String>,

    #[validate(url)]
    pub catalog_url: String,

    pub stations_csv_url: Option<String>,

    #[validate(range(min = 1))]
    pub batch_size: usize,

    #[validate(range(min = 1))]
    pub max_parallel_batches: usize,

    #[validate(range(min = 1))]
    pub max_connections: u32,

    #[validate(range(min = 1))]
    pub acquire_timeout_secs: u64,

    #[validate(range(min = 1))]
    pub http_timeout_secs: u64,

    pub staging_dir: Option<PathBuf>,

    pub restrict_to_known_stations: bool,

    #[validate(range(min = 1))]
    pub max_catalog_pages: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            stations_csv_url: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_parallel_batches: DEFAULT_MAX_PARALLEL_BATCHES,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            staging_dir: None,
            restrict_to_known_stations: true,
            max_catalog_pages: DEFAULT_MAX_CATALOG_PAGES,
        }
    }
}

impl IngestConfig {
    /// Load from the process environment. An explicit `path` must exist;
    /// otherwise `meteo-ingest.toml` is read when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// As [`IngestConfig::load`], with the unprefixed variables looked up
    /// through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("catalog_url", defaults.catalog_url)?
            .set_default("batch_size", defaults.batch_size as u64)?
            .set_default("max_parallel_batches", defaults.max_parallel_batches as u64)?
            .set_default("max_connections", defaults.max_connections as u64)?
            .set_default("acquire_timeout_secs", defaults.acquire_timeout_secs)?
            .set_default("http_timeout_secs", defaults.http_timeout_secs)?
            .set_default("restrict_to_known_stations", defaults.restrict_to_known_stations)?
            .set_default("max_catalog_pages", defaults.max_catalog_pages as u64)?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            builder = builder.set_override("database_url", url)?;
        }
        if let Some(url) = lookup("POSTES_CSV_URL").filter(|v| !v.is_empty()) {
            builder = builder.set_override("stations_csv_url", url)?;
        }

        let config: IngestConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ProcessingError::Config(
                    "DATABASE_URL is not set (environment or config file)".to_string(),
                )
            })
    }

    /// The station file to load: the caller's override, else the configured URL.
    pub fn stations_url(&self, override_url: Option<&str>) -> Result<String> {
        override_url
            .or(self.stations_csv_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ProcessingError::Config(
                    "POSTES_CSV_URL is not set and no --url was given".to_string(),
                )
            })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let config = IngestConfig::load_with(None, no_env)?;
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_parallel_batches, 300);
        assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
        assert!(config.restrict_to_known_stations);
        Ok(())
    }

    #[test]
    fn test_missing_database_url_is_fatal() {
        let config = IngestConfig::default();
        let err = config.require_database_url().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_file_then_well_known_variables() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            "database_url = \"postgres://file/db\"\nbatch_size = 10\nstations_csv_url = \"https://file/postes.csv\""
        )?;

        let config = IngestConfig::load_with(Some(file.path()), |name| match name {
            "DATABASE_URL" => Some("postgres://env/db".to_string()),
            _ => None,
        })?;

        assert_eq!(config.batch_size, 10);
        assert_eq!(config.require_database_url()?, "postgres://env/db");
        assert_eq!(config.stations_url(None)?, "https://file/postes.csv");
        assert_eq!(
            config.stations_url(Some("https://cli/postes.csv"))?,
            "https://cli/postes.csv"
        );
        Ok(())
    }

    #[test]
    fn test_zero_batch_size_is_rejected() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "batch_size = 0")?;
        let err = IngestConfig::load_with(Some(file.path()), no_env).unwrap_err();
        assert!(matches!(err, ProcessingError::Validation(_)));
        assert!(err.is_fatal());
        Ok(())
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let err = IngestConfig::load_with(Some(Path::new("/nonexistent/meteo.toml")), no_env)
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
