/// Remote catalog of hourly observation archives (data.gouv.fr resource listing)
pub const DEFAULT_CATALOG_URL: &str =
    "https://www.data.gouv.fr/api/2/datasets/6569b4473bedf2e7abad3b72/resources/?page=1&page_size=10000";

/// Target tables
pub const OBSERVATION_TABLE: &str = "ObservationHoraire";
pub const STATION_TABLE: &str = "Poste";

/// Station identifier shape
pub const STATION_ID_COLUMN: &str = "numPoste";
pub const STATION_ID_WIDTH: usize = 8;

/// Source file format
pub const SOURCE_DELIMITER: u8 = b';';
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Staging artifact format
pub const STAGING_DELIMITER: u8 = b',';
pub const STAGING_FILE_PREFIX: &str = "meteo-staging-";
pub const STAGING_TABLE_PREFIX: &str = "staging_";

/// Processing defaults
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_MAX_PARALLEL_BATCHES: usize = 300;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MAX_CATALOG_PAGES: usize = 50;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const COPY_CHUNK_SIZE: usize = 1024 * 1024;

/// Configuration sources
pub const CONFIG_ENV_PREFIX: &str = "METEO";
pub const DEFAULT_CONFIG_FILE: &str = "meteo-ingest.toml";
