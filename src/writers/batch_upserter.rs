use crate::error::{ProcessingError, Result};
use crate::models::{CanonicalRecord, ColumnType, Value};
use crate::processors::RecordSink;
use crate::schema::DatasetSchema;
use crate::writers::sql;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Outcome of a wave-scheduled run of batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaveSummary {
    pub batches: usize,
    pub succeeded_batches: usize,
    pub failed_batches: usize,
    /// Sum reported by successful batches only.
    pub inserted: u64,
    /// Records belonging to failed batches.
    pub failed_records: usize,
    pub errors: Vec<String>,
}

/// Split `items` into batches and run `op` on each with bounded parallelism.
///
/// Admission is fill-drain-refill: batches are spawned until `max_parallel`
/// are in flight, then every in-flight batch settles before more are
/// admitted. A failed batch is recorded and never cancels its siblings.
pub async fn run_in_waves<T, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    max_parallel: usize,
    op: F,
) -> WaveSummary
where
    T: Send + 'static,
    F: Fn(usize, Vec<T>) -> Fut,
    Fut: Future<Output = Result<u64>> + Send + 'static,
{
    let batch_size = batch_size.max(1);
    let max_parallel = max_parallel.max(1);

    let mut batches: Vec<Vec<T>> = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        batches.push(items.by_ref().take(batch_size).collect());
    }

    let mut summary = WaveSummary {
        batches: batches.len(),
        ..WaveSummary::default()
    };
    let mut in_flight = JoinSet::new();

    for (index, batch) in batches.into_iter().enumerate() {
        let size = batch.len();
        let task = op(index, batch);
        in_flight.spawn(async move { (index, size, task.await) });

        if in_flight.len() >= max_parallel {
            drain(&mut in_flight, &mut summary).await;
        }
    }
    drain(&mut in_flight, &mut summary).await;

    summary
}

async fn drain(in_flight: &mut JoinSet<(usize, usize, Result<u64>)>, summary: &mut WaveSummary) {
    while let Some(joined) = in_flight.join_next().await {
        match joined {
            Ok((_, _, Ok(count))) => {
                summary.succeeded_batches += 1;
                summary.inserted += count;
            }
            Ok((index, size, Err(e))) => {
                warn!("Batch {} ({} records) failed: {}", index, size, e);
                summary.failed_batches += 1;
                summary.failed_records += size;
                summary.errors.push(format!("batch {}: {}", index, e));
            }
            Err(e) => {
                warn!("Batch task did not complete: {}", e);
                summary.failed_batches += 1;
                summary.errors.push(ProcessingError::from(e).to_string());
            }
        }
    }
}

/// Upserts records through ordinary transactions, one per batch.
pub struct BatchUpserter {
    pool: PgPool,
    request_id: String,
    batch_size: usize,
    max_parallel: usize,
}

impl BatchUpserter {
    pub fn new(pool: PgPool, request_id: impl Into<String>) -> Self {
        Self {
            pool,
            request_id: request_id.into(),
            batch_size: crate::utils::constants::DEFAULT_BATCH_SIZE,
            max_parallel: crate::utils::constants::DEFAULT_MAX_PARALLEL_BATCHES,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub async fn upsert_in_waves(
        &self,
        records: Vec<CanonicalRecord>,
        schema: &'static DatasetSchema,
    ) -> WaveSummary {
        let start = Instant::now();
        let statement = Arc::new(sql::upsert_sql(schema));
        let total = records.len();

        info!(
            "[{}] Upserting {} records into {} (batch size {}, {} batches in flight)",
            self.request_id, total, schema.table, self.batch_size, self.max_parallel
        );

        let summary = run_in_waves(records, self.batch_size, self.max_parallel, |index, batch| {
            let pool = self.pool.clone();
            let statement = Arc::clone(&statement);
            let request_id = self.request_id.clone();
            async move {
                let count = upsert_batch(&pool, &statement, &batch).await?;
                debug!("[{}] Batch {} committed {} rows", request_id, index, count);
                Ok(count)
            }
        })
        .await;

        info!(
            "[{}] {} of {} batches committed, {} rows upserted in {:.2}s",
            self.request_id,
            summary.succeeded_batches,
            summary.batches,
            summary.inserted,
            start.elapsed().as_secs_f64()
        );
        if summary.failed_batches > 0 {
            warn!(
                "[{}] {} batches failed, {} records not written",
                self.request_id, summary.failed_batches, summary.failed_records
            );
        }
        summary
    }
}

impl RecordSink for BatchUpserter {
    async fn upsert_all(
        &self,
        records: Vec<CanonicalRecord>,
        schema: &'static DatasetSchema,
    ) -> Result<u64> {
        Ok(self.upsert_in_waves(records, schema).await.inserted)
    }
}

/// One all-or-nothing transaction of per-row upserts.
async fn upsert_batch(pool: &PgPool, statement: &str, batch: &[CanonicalRecord]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut affected = 0;

    for record in batch {
        let mut query = sqlx::query(statement);
        for (column, value) in record.iter() {
            query = bind_value(query, column.column_type, value);
        }
        affected += query.execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    Ok(affected)
}

/// Bind with the column's own type so nulls carry a concrete parameter type.
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    column_type: ColumnType,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match column_type {
        ColumnType::Text => query.bind(value.as_str().map(str::to_string)),
        ColumnType::Integer => query.bind(value.as_i64().and_then(|i| i32::try_from(i).ok())),
        ColumnType::Float => query.bind(value.as_f64()),
        // Timestamps are stored without zone, always as UTC wall time.
        ColumnType::Timestamp => query.bind(value.as_timestamp().map(|ts| ts.naive_utc())),
        ColumnType::Boolean => query.bind(value.as_bool()),
    }
}
