use crate::cli::args::{Cli, Commands};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::models::RunReport;
use crate::processors::pipeline::MISSING_PERIOD_MESSAGE;
use crate::processors::{required_period, IngestPipeline};
use crate::readers::{CatalogClient, FileSource};
use crate::schema::{observation, station};
use crate::staging::StagingArea;
use crate::utils::request_id::new_request_id;
use crate::writers::{sql, BatchUpserter, BulkLoader};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Execute a subcommand. Returns `false` when the run reported failure.
pub async fn run(cli: Cli) -> Result<bool> {
    let config = IngestConfig::load(cli.config.as_deref());

    match cli.command {
        Commands::Observations {
            period,
            all_stations,
        } => {
            let request_id = new_request_id();
            let start = Instant::now();
            let report = match config {
                Ok(mut config) => {
                    if all_stations {
                        config.restrict_to_known_stations = false;
                    }
                    observations(&config, &request_id, period.as_deref(), cli.progress).await
                }
                Err(e) => RunReport::failed(&request_id, e.to_string(), start.elapsed()),
            };
            print_report(&report)
        }

        Commands::Stations {
            url,
            batch_size,
            max_parallel,
        } => {
            let request_id = new_request_id();
            let start = Instant::now();
            let report = match config {
                Ok(mut config) => {
                    if let Some(size) = batch_size {
                        config.batch_size = size.max(1);
                    }
                    if let Some(parallel) = max_parallel {
                        config.max_parallel_batches = parallel.max(1);
                    }
                    stations(&config, &request_id, url.as_deref()).await
                }
                Err(e) => RunReport::failed(&request_id, e.to_string(), start.elapsed()),
            };
            print_report(&report)
        }

        Commands::List { period } => {
            let config = config?;
            let catalog = CatalogClient::new(&config.catalog_url, config.http_timeout())?
                .with_max_pages(config.max_catalog_pages);
            let urls = catalog.list_files(period.as_deref()).await?;
            info!("{} files selected from {}", urls.len(), catalog.catalog_url());
            println!("{}", serde_json::to_string_pretty(&urls)?);
            Ok(true)
        }

        Commands::InitDb => {
            let config = config?;
            let pool = connect(&config).await?;
            let result = create_tables(&pool).await;
            pool.close().await;
            let tables = result?;
            println!("{}", serde_json::to_string_pretty(&tables)?);
            Ok(true)
        }
    }
}

async fn observations(
    config: &IngestConfig,
    request_id: &str,
    period: Option<&str>,
    show_progress: bool,
) -> RunReport {
    let start = Instant::now();
    let Some(period) = required_period(period) else {
        error!("[{}] {}", request_id, MISSING_PERIOD_MESSAGE);
        return RunReport::failed(request_id, MISSING_PERIOD_MESSAGE, start.elapsed());
    };
    let resources = match RunResources::open(config).await {
        Ok(resources) => resources,
        Err(e) => return RunReport::failed(request_id, e.to_string(), start.elapsed()),
    };

    let loader = BulkLoader::new(resources.pool.clone(), request_id)
        .with_parent_filter(config.restrict_to_known_stations);
    let pipeline = IngestPipeline::new(resources.catalog.clone(), loader, resources.staging.clone())
        .with_request_id(request_id)
        .with_progress(show_progress);

    let report = pipeline.run_observations(Some(period)).await;
    resources.close().await;
    report
}

async fn stations(config: &IngestConfig, request_id: &str, url: Option<&str>) -> RunReport {
    let start = Instant::now();
    let url = match config.stations_url(url) {
        Ok(url) => url,
        Err(e) => return RunReport::failed(request_id, e.to_string(), start.elapsed()),
    };
    let resources = match RunResources::open(config).await {
        Ok(resources) => resources,
        Err(e) => return RunReport::failed(request_id, e.to_string(), start.elapsed()),
    };

    let upserter = BatchUpserter::new(resources.pool.clone(), request_id)
        .with_batch_size(config.batch_size)
        .with_max_parallel(config.max_parallel_batches);
    let pipeline = IngestPipeline::new(resources.catalog.clone(), upserter, resources.staging.clone())
        .with_request_id(request_id);

    let report = pipeline.run_stations(&url).await;
    resources.close().await;
    report
}

/// Handles shared by one run; the pool is closed when the run ends.
struct RunResources {
    pool: PgPool,
    catalog: CatalogClient,
    staging: Arc<StagingArea>,
}

impl RunResources {
    async fn open(config: &IngestConfig) -> Result<Self> {
        let catalog = CatalogClient::new(&config.catalog_url, config.http_timeout())?
            .with_max_pages(config.max_catalog_pages);
        let staging = Arc::new(StagingArea::from_config(config.staging_dir.as_deref())?);
        let pool = connect(config).await?;
        Ok(Self {
            pool,
            catalog,
            staging,
        })
    }

    async fn close(self) {
        self.pool.close().await;
        debug!("Connection pool closed");
    }
}

async fn connect(config: &IngestConfig) -> Result<PgPool> {
    let url = config.require_database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(url)
        .await?;
    debug!(
        "Connected to database ({} connections max)",
        config.max_connections
    );
    Ok(pool)
}

/// Parent table first so the observation filter has something to join against.
async fn create_tables(pool: &PgPool) -> Result<Vec<&'static str>> {
    let mut created = Vec::new();
    for schema in [station::schema(), observation::schema()] {
        sqlx::query(&sql::create_table_sql(schema))
            .execute(pool)
            .await?;
        info!("Table {} ready ({} columns)", schema.table, schema.columns().len());
        created.push(schema.table);
    }
    Ok(created)
}

fn print_report(report: &RunReport) -> Result<bool> {
    info!("{}", report.summary());
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(report.success)
}
