use crate::error::Result;
use crate::processors::MergeTarget;
use crate::schema::DatasetSchema;
use crate::staging::StagedFile;
use crate::utils::constants::COPY_CHUNK_SIZE;
use crate::writers::sql;
use sqlx::postgres::PgCopyIn;
use sqlx::{PgConnection, PgPool};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Loads a staged file through a transient staging table, then merges it
/// into the permanent table with one `INSERT ... ON CONFLICT DO UPDATE`.
///
/// Each call runs in its own transaction. Any failure rolls it back, which
/// also discards the staging table.
pub struct BulkLoader {
    pool: PgPool,
    request_id: String,
    restrict_to_parent: bool,
    sequence: AtomicU64,
}

impl BulkLoader {
    pub fn new(pool: PgPool, request_id: impl Into<String>) -> Self {
        Self {
            pool,
            request_id: request_id.into(),
            restrict_to_parent: true,
            sequence: AtomicU64::new(0),
        }
    }

    /// Drop rows whose key is unknown to the schema's parent table.
    pub fn with_parent_filter(mut self, restrict: bool) -> Self {
        self.restrict_to_parent = restrict;
        self
    }
}

impl MergeTarget for BulkLoader {
    /// Returns the number of rows inserted or updated by the merge.
    async fn load_and_merge(
        &self,
        staged: &StagedFile,
        schema: &'static DatasetSchema,
    ) -> Result<u64> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let staging = sql::staging_table_name(schema.table, &self.request_id, sequence);
        let columns = staged.column_names();

        let mut tx = self.pool.begin().await?;

        sqlx::query(&sql::create_staging_sql(&staging, schema.table))
            .execute(&mut *tx)
            .await?;
        debug!("[{}] Created staging table {}", self.request_id, staging);

        let copy_start = Instant::now();
        let copied = copy_file(&mut *tx, &sql::copy_sql(&staging, &columns), staged.path()).await?;
        info!(
            "[{}] Copied {} rows into {} in {:.2}s",
            self.request_id,
            copied,
            staging,
            copy_start.elapsed().as_secs_f64()
        );

        let merge_start = Instant::now();
        let merged = sqlx::query(&sql::merge_sql(schema, &staging, self.restrict_to_parent))
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(&sql::drop_staging_sql(&staging))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if merged < copied {
            debug!(
                "[{}] {} staged rows skipped by the parent filter",
                self.request_id,
                copied - merged
            );
        }
        info!(
            "[{}] Merged {} rows into {} in {:.2}s",
            self.request_id,
            merged,
            schema.table,
            merge_start.elapsed().as_secs_f64()
        );
        Ok(merged)
    }
}

/// Stream a file into `COPY ... FROM STDIN`, chunk by chunk.
async fn copy_file(conn: &mut PgConnection, statement: &str, path: &Path) -> Result<u64> {
    let mut copy = conn.copy_in_raw(statement).await?;

    match send_chunks(&mut copy, path).await {
        Ok(()) => Ok(copy.finish().await?),
        Err(e) => {
            if let Err(abort_err) = copy.abort(e.to_string()).await {
                warn!("Failed to abort COPY cleanly: {}", abort_err);
            }
            Err(e)
        }
    }
}

async fn send_chunks(copy: &mut PgCopyIn<&mut PgConnection>, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = vec![0u8; COPY_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        copy.send(&buffer[..read]).await?;
    }
    Ok(())
}
