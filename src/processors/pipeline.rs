use crate::error::{ProcessingError, Result};
use crate::models::{CanonicalRecord, FileReport, RunReport};
use crate::processors::RecordNormalizer;
use crate::readers::{Compression, DelimitedReader, FileSource};
use crate::schema::{DatasetKind, DatasetSchema};
use crate::staging::{StagedFile, Stager, StagingArea};
use crate::utils::progress::ProgressReporter;
use crate::utils::request_id::new_request_id;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub const NO_FILES_MESSAGE: &str = "No files found for the specified period";
pub const MISSING_PERIOD_MESSAGE: &str = "Missing required parameter: period";

/// The trimmed period selector, or `None` when it is absent or blank.
pub fn required_period(period: Option<&str>) -> Option<&str> {
    period.map(str::trim).filter(|p| !p.is_empty())
}

/// Bulk-load path: one staged file in, rows merged out.
#[allow(async_fn_in_trait)]
pub trait MergeTarget {
    async fn load_and_merge(&self, staged: &StagedFile, schema: &'static DatasetSchema)
        -> Result<u64>;
}

/// Batched upsert path for in-memory records.
#[allow(async_fn_in_trait)]
pub trait RecordSink {
    async fn upsert_all(
        &self,
        records: Vec<CanonicalRecord>,
        schema: &'static DatasetSchema,
    ) -> Result<u64>;
}

/// Drives a run from listing to report.
///
/// Observation files are processed one at a time, in listing order. A file
/// that fails at any stage is recorded in the report and the run moves on.
pub struct IngestPipeline<S, T> {
    source: S,
    target: T,
    staging: Arc<StagingArea>,
    request_id: String,
    show_progress: bool,
}

impl<S: FileSource, T> IngestPipeline<S, T> {
    pub fn new(source: S, target: T, staging: Arc<StagingArea>) -> Self {
        Self {
            source,
            target,
            staging,
            request_id: new_request_id(),
            show_progress: false,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn target(&self) -> &T {
        &self.target
    }
}

impl<S: FileSource, T: MergeTarget> IngestPipeline<S, T> {
    pub async fn run_observations(&self, period: Option<&str>) -> RunReport {
        let start = Instant::now();
        let id = self.request_id.as_str();

        let period = match required_period(period) {
            Some(period) => period,
            None => {
                error!("[{}] {}", id, MISSING_PERIOD_MESSAGE);
                return RunReport::failed(id, MISSING_PERIOD_MESSAGE, start.elapsed());
            }
        };
        info!("[{}] Starting observation update for period {}", id, period);

        let urls = match self.source.list_files(Some(period)).await {
            Ok(urls) => urls,
            Err(e) => {
                error!("[{}] Listing failed, run aborted: {}", id, e);
                return RunReport::failed(id, e.to_string(), start.elapsed());
            }
        };

        if urls.is_empty() {
            info!("[{}] {}", id, NO_FILES_MESSAGE);
            return RunReport::completed(id, NO_FILES_MESSAGE, Vec::new(), start.elapsed());
        }
        info!("[{}] {} files to process", id, urls.len());

        let stager = Stager::new(
            DelimitedReader::new(RecordNormalizer::for_kind(DatasetKind::Observation)),
            Arc::clone(&self.staging),
        );
        let progress = ProgressReporter::new(urls.len() as u64, "Processing files", !self.show_progress);

        let mut files = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            progress.set_message(&format!("File {}/{}: {}", i + 1, urls.len(), url));
            let report = match self.process_file(&stager, url).await {
                Ok(inserted) => FileReport::success(url, inserted),
                Err(e) => {
                    error!("[{}] Error processing file {}: {}", id, url, e);
                    FileReport::failure(url, e.to_string())
                }
            };
            files.push(report);
            progress.increment(1);
        }

        let report = RunReport::completed(id, "Insertion completed", files, start.elapsed());
        progress.finish_with_message(&report.summary());
        info!("[{}] {}", id, report.summary());
        report
    }

    async fn process_file(&self, stager: &Stager, url: &str) -> Result<u64> {
        let id = self.request_id.as_str();

        let download_start = Instant::now();
        let payload = self.source.fetch_one(url).await?;
        info!(
            "[{}] Downloaded {} ({} bytes) in {:.2}s",
            id,
            url,
            payload.len(),
            download_start.elapsed().as_secs_f64()
        );

        let stage_start = Instant::now();
        let staged = stager.stage(payload).await?;
        info!(
            "[{}] Staged {} rows from {} in {:.2}s",
            id,
            staged.row_count(),
            url,
            stage_start.elapsed().as_secs_f64()
        );
        log_scan_warnings(id, url, &staged);

        let schema = DatasetKind::Observation.schema();
        let merged = self.target.load_and_merge(&staged, schema).await;
        if let Err(e) = staged.cleanup() {
            warn!("[{}] Failed to remove staging file for {}: {}", id, url, e);
        }
        merged
    }
}

impl<S: FileSource, T: RecordSink> IngestPipeline<S, T> {
    pub async fn run_stations(&self, url: &str) -> RunReport {
        let start = Instant::now();
        let id = self.request_id.as_str();
        info!("[{}] Starting station update from {}", id, url);

        let file = match self.load_stations(url).await {
            Ok(inserted) => FileReport::success(url, inserted),
            Err(e) if e.is_fatal() => {
                error!("[{}] Station update aborted: {}", id, e);
                return RunReport::failed(id, e.to_string(), start.elapsed());
            }
            Err(e) => {
                error!("[{}] Error processing station file {}: {}", id, url, e);
                FileReport::failure(url, e.to_string())
            }
        };

        let report =
            RunReport::completed(id, "Station update completed", vec![file], start.elapsed());
        info!("[{}] {}", id, report.summary());
        report
    }

    async fn load_stations(&self, url: &str) -> Result<u64> {
        let id = self.request_id.as_str();
        if url.trim().is_empty() {
            return Err(ProcessingError::Config(
                "No station file URL configured".to_string(),
            ));
        }

        let download_start = Instant::now();
        let payload = self.source.fetch_one(url).await?;
        info!(
            "[{}] Downloaded {} ({} bytes) in {:.2}s",
            id,
            url,
            payload.len(),
            download_start.elapsed().as_secs_f64()
        );

        let reader = DelimitedReader::new(RecordNormalizer::for_kind(DatasetKind::Station))
            .with_compression(Compression::Detect);
        let (records, stats) =
            tokio::task::spawn_blocking(move || reader.read_all(&payload)).await??;

        if stats.rejected > 0 {
            warn!(
                "[{}] Rejected {} of {} station records with a blank numPoste",
                id, stats.rejected, stats.observed
            );
        }
        if !stats.header.unknown.is_empty() {
            warn!("[{}] Unknown columns ignored: {:?}", id, stats.header.unknown);
        }
        info!("[{}] {} station records normalized", id, records.len());

        self.target
            .upsert_all(records, DatasetKind::Station.schema())
            .await
    }
}

fn log_scan_warnings(id: &str, url: &str, staged: &StagedFile) {
    let stats = staged.stats();
    if stats.rejected > 0 {
        warn!(
            "[{}] Rejected {} of {} rows in {} with a blank key",
            id, stats.rejected, stats.observed, url
        );
    }
    if !stats.header.unknown.is_empty() {
        warn!(
            "[{}] Unknown columns ignored in {}: {:?}",
            id, url, stats.header.unknown
        );
    }
    if !stats.header.missing.is_empty() {
        info!(
            "[{}] {} described columns absent from {}, stored as null",
            id,
            stats.header.missing.len(),
            url
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileStatus, Value};
    use flate2::write::GzEncoder;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    struct MockSource {
        listing: Result<Vec<String>>,
        files: HashMap<String, Vec<u8>>,
    }

    impl MockSource {
        fn new(files: &[(&str, Option<Vec<u8>>)]) -> Self {
            Self {
                listing: Ok(files.iter().map(|(u, _)| u.to_string()).collect()),
                files: files
                    .iter()
                    .filter_map(|(u, body)| body.clone().map(|b| (u.to_string(), b)))
                    .collect(),
            }
        }
    }

    impl FileSource for MockSource {
        async fn list_files(&self, selector: Option<&str>) -> Result<Vec<String>> {
            match &self.listing {
                Ok(urls) => Ok(crate::readers::select_urls(urls.clone(), selector)),
                Err(e) => Err(ProcessingError::Catalog(e.to_string())),
            }
        }

        async fn fetch_one(&self, url: &str) -> Result<Vec<u8>> {
            self.files.get(url).cloned().ok_or_else(|| ProcessingError::Http {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    /// Counts staged rows as merged, remembering what it saw.
    #[derive(Default)]
    struct MockTarget {
        seen: Mutex<Vec<u64>>,
        records: Mutex<Vec<CanonicalRecord>>,
    }

    impl MergeTarget for MockTarget {
        async fn load_and_merge(
            &self,
            staged: &StagedFile,
            _schema: &'static DatasetSchema,
        ) -> Result<u64> {
            assert!(staged.path().exists());
            self.seen.lock().unwrap().push(staged.staged_rows());
            Ok(staged.staged_rows())
        }
    }

    impl RecordSink for MockTarget {
        async fn upsert_all(
            &self,
            records: Vec<CanonicalRecord>,
            _schema: &'static DatasetSchema,
        ) -> Result<u64> {
            let count = records.len() as u64;
            self.records.lock().unwrap().extend(records);
            Ok(count)
        }
    }

    fn observation_file(rows: &[&str]) -> Vec<u8> {
        let mut body = String::from("NUM_POSTE;NOM_USUEL;AAAAMMJJHH;T;QT\n");
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        gzip(body.as_bytes())
    }

    fn pipeline<T>(source: MockSource, target: T) -> IngestPipeline<MockSource, T> {
        let staging = Arc::new(StagingArea::new().unwrap());
        IngestPipeline::new(source, target, staging).with_request_id("test0001")
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort_run() {
        let source = MockSource::new(&[
            ("https://files/H_01_2020-2023.csv.gz", Some(observation_file(&[
                "1014002;AMBERIEU;2020010100;2.5;1",
                "1014002;AMBERIEU;2020010101;2.1;1",
            ]))),
            ("https://files/H_02_2020-2023.csv.gz", None),
            ("https://files/H_03_2020-2023.csv.gz", Some(observation_file(&[
                "3060001;MOULINS;2020010100;4.0;1",
            ]))),
        ]);
        let p = pipeline(source, MockTarget::default());

        let report = p.run_observations(Some("2020-2023")).await;

        assert!(report.success);
        assert_eq!(report.request_id, "test0001");
        assert_eq!(report.total_files, 3);
        assert_eq!(report.total_inserted, 3);
        let statuses: Vec<FileStatus> = report.processed_files.iter().map(|f| f.status).collect();
        assert_eq!(
            statuses,
            vec![FileStatus::Success, FileStatus::Error, FileStatus::Success]
        );
        assert_eq!(report.processed_files[1].inserted, 0);
        assert!(report.processed_files[1]
            .error
            .as_deref()
            .unwrap()
            .contains("HTTP 404"));
    }

    #[tokio::test]
    async fn test_files_processed_in_listing_order() {
        let source = MockSource::new(&[
            ("https://files/a_2020.csv.gz", Some(observation_file(&["1;X;2020010100;1;1"]))),
            ("https://files/b_2020.csv.gz", Some(observation_file(&[
                "1;X;2020010100;1;1",
                "2;Y;2020010100;1;1",
            ]))),
        ]);
        let p = pipeline(source, MockTarget::default());
        p.run_observations(Some("2020")).await;
        assert_eq!(*p.target().seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_decompression_failure_is_per_file() {
        let source = MockSource::new(&[
            ("https://files/bad_2020.csv.gz", Some(b"definitely not gzip".to_vec())),
            ("https://files/good_2020.csv.gz", Some(observation_file(&["1;X;2020010100;1;1"]))),
        ]);
        let p = pipeline(source, MockTarget::default());
        let report = p.run_observations(Some("2020")).await;

        assert!(report.success);
        assert_eq!(report.failed_files(), 1);
        assert_eq!(report.total_inserted, 1);
        assert_eq!(p.staging.pending_files().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejected_rows_are_not_staged() {
        let source = MockSource::new(&[(
            "https://files/H_2020.csv.gz",
            Some(observation_file(&[
                ";NOBODY;2020010100;1;1",
                "1014002;AMBERIEU;notadate;1;1",
                "1014002;AMBERIEU;2020010100;1;1",
            ])),
        )]);
        let p = pipeline(source, MockTarget::default());
        let report = p.run_observations(Some("2020")).await;
        assert_eq!(report.total_inserted, 1);
    }

    #[tokio::test]
    async fn test_empty_match_is_not_a_failure() {
        let source = MockSource::new(&[("https://files/H_01_1950-1959.csv.gz", None)]);
        let p = pipeline(source, MockTarget::default());
        let report = p.run_observations(Some("2020-2023")).await;

        assert!(report.success);
        assert_eq!(report.total_files, 0);
        assert_eq!(report.message, NO_FILES_MESSAGE);
    }

    #[tokio::test]
    async fn test_missing_period_is_rejected() {
        let p = pipeline(MockSource::new(&[]), MockTarget::default());
        for period in [None, Some(""), Some("  ")] {
            let report = p.run_observations(period).await;
            assert!(!report.success);
            assert_eq!(report.error.as_deref(), Some(MISSING_PERIOD_MESSAGE));
        }
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_run() {
        let mut source = MockSource::new(&[]);
        source.listing = Err(ProcessingError::Catalog("unreachable".to_string()));
        let p = pipeline(source, MockTarget::default());

        let report = p.run_observations(Some("2020")).await;
        assert!(!report.success);
        assert!(report.processed_files.is_empty());
        assert!(report.error.unwrap().contains("unreachable"));
    }

    #[tokio::test]
    async fn test_station_run() {
        let body = b"NUM_POSTE;NOM_USUEL;DATFERM\n14002;Paris;\n;Ghost;\n75114001;Orly;2001-06-30\n";
        let source = MockSource::new(&[("https://files/postes.csv", Some(body.to_vec()))]);
        let p = pipeline(source, MockTarget::default());

        let report = p.run_stations("https://files/postes.csv").await;

        assert!(report.success);
        assert_eq!(report.total_files, 1);
        assert_eq!(report.total_inserted, 2);

        let records = p.target().records.lock().unwrap();
        assert_eq!(records[0].get("numPoste"), Some(&Value::Text("00014002".to_string())));
        assert_eq!(records[0].get("posteOuvert"), Some(&Value::Bool(true)));
        assert_eq!(records[1].get("posteOuvert"), Some(&Value::Bool(false)));
    }

    #[tokio::test]
    async fn test_station_download_failure_is_per_file() {
        let url = "https://files/missing.csv.gz";
        let p = pipeline(MockSource::new(&[]), MockTarget::default());
        let report = p.run_stations(url).await;

        assert!(report.success);
        assert!(report.error.is_none());
        assert_eq!(report.total_files, 1);
        assert_eq!(report.total_inserted, 0);
        assert_eq!(report.processed_files[0].url, url);
        assert_eq!(report.processed_files[0].status, FileStatus::Error);
        assert_eq!(report.processed_files[0].inserted, 0);
        assert!(report.processed_files[0]
            .error
            .as_deref()
            .unwrap()
            .contains("HTTP 404"));
        assert!(p.target().records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_station_decompression_failure_is_per_file() {
        let url = "https://files/postes.csv.gz";
        let mut corrupt = gzip(b"NUM_POSTE;NOM_USUEL\n14002;Paris\n");
        let len = corrupt.len();
        corrupt.truncate(len - 12);
        let source = MockSource::new(&[(url, Some(corrupt))]);
        let p = pipeline(source, MockTarget::default());

        let report = p.run_stations(url).await;

        assert!(report.success);
        assert_eq!(report.failed_files(), 1);
        assert_eq!(report.processed_files[0].status, FileStatus::Error);
    }

    #[tokio::test]
    async fn test_station_blank_url_fails_run() {
        let p = pipeline(MockSource::new(&[]), MockTarget::default());
        let report = p.run_stations("  ").await;

        assert!(!report.success);
        assert!(report.processed_files.is_empty());
        assert!(report.error.unwrap().contains("No station file URL configured"));
    }
}
