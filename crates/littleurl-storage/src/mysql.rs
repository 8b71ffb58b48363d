use async_trait::async_trait;
use jiff::Timestamp;
use littleurl_core::repository::{
    ContinuationToken, InsertOutcome, MoveOutcome, RecordFilter, RecordPage, RecordStore, Result,
};
use littleurl_core::{RecordState, ShortKey, StorageError, UrlRecord};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};
use tracing::{debug, info};

/// Table used when none is configured.
pub const DEFAULT_TABLE_NAME: &str = "little_urls";

/// Page size of partition scans.
pub const SCAN_PAGE_SIZE: u32 = 500;

const COLUMNS: &str =
    "partition_key, short_key, long_url, url_id, created_at, last_accessed_at, deleted_at, purge_at";

/// MySQL implementation of the record store contract.
///
/// All records live in a single table keyed by `(partition_key, short_key)`.
/// The partition key holds the state discriminator (`"True"` for active,
/// `"False"` for deleted). Timestamps are stored as unix milliseconds.
///
/// Unlike the default delete-then-insert, [`RecordStore::move_record`] runs
/// as one transaction, so a failed move leaves the record where it was.
#[derive(Debug, Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
    table: String,
}

impl MySqlRecordStore {
    /// Creates a store from an existing MySQL connection pool.
    ///
    /// The table name must be a plain identifier (`[A-Za-z0-9_]+`).
    pub fn new(pool: MySqlPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(StorageError::Operation(format!(
                "invalid table name '{}'",
                table
            )));
        }
        Ok(Self { pool, table })
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str, table: impl Into<String>) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Self::new(pool, table)
    }

    /// Creates the backing table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let ddl = include_str!("../ddl/mysql/little_urls.sql")
            .replace(DEFAULT_TABLE_NAME, &self.table);
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        info!(table = %self.table, "record table ready");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn to_millis(ts: Timestamp) -> i64 {
    ts.as_millisecond()
}

fn parse_millis(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {} timestamp '{}': {e}", column, millis))
    })
}

fn parse_optional_millis(column: &str, millis: Option<i64>) -> Result<Option<Timestamp>> {
    millis.map(|value| parse_millis(column, value)).transpose()
}

fn decode_row(row: &MySqlRow) -> Result<UrlRecord> {
    let partition: String = row.try_get("partition_key").map_err(map_sqlx_error)?;
    let state = RecordState::from_partition_key(&partition).ok_or_else(|| {
        StorageError::InvalidData(format!("unknown partition key '{}'", partition))
    })?;
    let short_key: String = row.try_get("short_key").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let last_accessed_at: i64 = row.try_get("last_accessed_at").map_err(map_sqlx_error)?;
    let deleted_at: Option<i64> = row.try_get("deleted_at").map_err(map_sqlx_error)?;
    let purge_at: Option<i64> = row.try_get("purge_at").map_err(map_sqlx_error)?;

    Ok(UrlRecord {
        short_key: ShortKey::new_unchecked(short_key),
        long_url: row.try_get("long_url").map_err(map_sqlx_error)?,
        url_id: row.try_get("url_id").map_err(map_sqlx_error)?,
        created_at: parse_millis("created_at", created_at)?,
        last_accessed_at: parse_millis("last_accessed_at", last_accessed_at)?,
        deleted_at: parse_optional_millis("deleted_at", deleted_at)?,
        purge_at: parse_optional_millis("purge_at", purge_at)?,
        state,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

impl MySqlRecordStore {
    fn insert_sql(&self, upsert: bool) -> String {
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            self.table, COLUMNS
        );
        if upsert {
            sql.push_str(
                " ON DUPLICATE KEY UPDATE long_url = VALUES(long_url), url_id = VALUES(url_id), \
                 created_at = VALUES(created_at), last_accessed_at = VALUES(last_accessed_at), \
                 deleted_at = VALUES(deleted_at), purge_at = VALUES(purge_at)",
            );
        }
        sql
    }

    async fn write(&self, state: RecordState, record: &UrlRecord, upsert: bool) -> Result<()> {
        let sql = self.insert_sql(upsert);
        sqlx::query(&sql)
            .bind(state.partition_key())
            .bind(record.short_key.as_str())
            .bind(record.long_url.as_str())
            .bind(record.url_id)
            .bind(to_millis(record.created_at))
            .bind(to_millis(record.last_accessed_at))
            .bind(record.deleted_at.map(to_millis))
            .bind(record.purge_at.map(to_millis))
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StorageError::Conflict(record.short_key.to_string())
                } else {
                    map_sqlx_error(err)
                }
            })
    }
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn get(&self, state: RecordState, key: &ShortKey) -> Result<Option<UrlRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE partition_key = ? AND short_key = ? LIMIT 1",
            COLUMNS, self.table
        );
        let row = sqlx::query(&sql)
            .bind(state.partition_key())
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn put(&self, state: RecordState, record: &UrlRecord) -> Result<()> {
        self.write(state, record, true).await
    }

    async fn insert_exclusive(
        &self,
        state: RecordState,
        record: &UrlRecord,
    ) -> Result<InsertOutcome> {
        match self.write(state, record, false).await {
            Ok(()) => Ok(InsertOutcome::Inserted),
            Err(StorageError::Conflict(_)) => Ok(InsertOutcome::AlreadyExists),
            Err(err) => Err(err),
        }
    }

    async fn delete(&self, state: RecordState, key: &ShortKey) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE partition_key = ? AND short_key = ?",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(state.partition_key())
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch(&self, state: RecordState, key: &ShortKey, at: Timestamp) -> Result<bool> {
        let sql = format!(
            "UPDATE {} SET last_accessed_at = ? WHERE partition_key = ? AND short_key = ?",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(to_millis(at))
            .bind(state.partition_key())
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        // MySQL counts changed rows, so rewriting the same instant reports 0.
        Ok(result.rows_affected() > 0)
    }

    async fn scan_page(
        &self,
        state: RecordState,
        filter: &RecordFilter,
        token: Option<ContinuationToken>,
    ) -> Result<RecordPage> {
        let mut query: QueryBuilder<'_, MySql> = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE partition_key = ",
            COLUMNS, self.table
        ));
        query.push_bind(state.partition_key());

        if let Some(token) = &token {
            query.push(" AND short_key > ");
            query.push_bind(token.as_str().to_string());
        }

        match filter {
            RecordFilter::All => {}
            RecordFilter::LongUrl(url) => {
                query.push(" AND long_url = ");
                query.push_bind(url.clone());
            }
            RecordFilter::LastAccessedBefore(cutoff) => {
                query.push(" AND last_accessed_at < ");
                query.push_bind(to_millis(*cutoff));
            }
            RecordFilter::PurgeDue(now) => {
                query.push(" AND purge_at IS NOT NULL AND purge_at <= ");
                query.push_bind(to_millis(*now));
            }
        }

        // One extra row tells us whether another page follows.
        query.push(" ORDER BY short_key LIMIT ");
        query.push_bind(SCAN_PAGE_SIZE + 1);

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut records = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
        let next_token = if records.len() > SCAN_PAGE_SIZE as usize {
            records.truncate(SCAN_PAGE_SIZE as usize);
            records
                .last()
                .map(|last| ContinuationToken::new(last.short_key.as_str()))
        } else {
            None
        };

        debug!(
            state = %state,
            returned = records.len(),
            more = next_token.is_some(),
            "scanned record page"
        );

        Ok(RecordPage {
            records,
            next_token,
        })
    }

    async fn move_record(&self, record: &UrlRecord) -> Result<MoveOutcome> {
        let from = record.state.opposite();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let update = format!(
            "UPDATE {} SET partition_key = ?, last_accessed_at = ?, deleted_at = ?, purge_at = ? \
             WHERE partition_key = ? AND short_key = ?",
            self.table
        );
        let moved = sqlx::query(&update)
            .bind(record.state.partition_key())
            .bind(to_millis(record.last_accessed_at))
            .bind(record.deleted_at.map(to_millis))
            .bind(record.purge_at.map(to_millis))
            .bind(from.partition_key())
            .bind(record.short_key.as_str())
            .execute(&mut *tx)
            .await;

        let outcome = match moved {
            Ok(result) if result.rows_affected() > 0 => MoveOutcome::Moved,
            Ok(_) => MoveOutcome::SourceMissing,
            Err(err) if is_unique_violation(&err) => {
                // The target already holds the key; drop the source copy so
                // the key lives in exactly one partition.
                let delete = format!(
                    "DELETE FROM {} WHERE partition_key = ? AND short_key = ?",
                    self.table
                );
                sqlx::query(&delete)
                    .bind(from.partition_key())
                    .bind(record.short_key.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
                MoveOutcome::TargetOccupied
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(outcome)
    }
}
