use crate::error::StorageError;
use crate::record::{RecordState, UrlRecord};
use crate::shortkey::ShortKey;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use jiff::Timestamp;

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A lazy, single logical sequence of records produced by [`RecordStoreExt::scan`].
pub type RecordStream<'a> = BoxStream<'a, Result<UrlRecord>>;

/// A predicate evaluated by the store while scanning a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every record in the partition.
    All,
    /// Records whose long URL equals the given value.
    LongUrl(String),
    /// Records last accessed strictly before the cutoff.
    LastAccessedBefore(Timestamp),
    /// Records whose purge deadline is at or before the given instant.
    PurgeDue(Timestamp),
}

impl RecordFilter {
    /// Evaluates the filter against a record.
    ///
    /// Backends that cannot push a filter down to the store use this to
    /// filter after loading.
    pub fn matches(&self, record: &UrlRecord) -> bool {
        match self {
            Self::All => true,
            Self::LongUrl(url) => record.long_url == *url,
            Self::LastAccessedBefore(cutoff) => record.last_accessed_at < *cutoff,
            Self::PurgeDue(now) => record.is_purge_due(*now),
        }
    }
}

/// An opaque, backend-specific position for resuming a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of scan results.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<UrlRecord>,
    /// Token for the next page. `None` means the scan is exhausted.
    pub next_token: Option<ContinuationToken>,
}

/// Outcome of an exclusive insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Outcome of moving a record between partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The record left the source partition and landed in the target.
    Moved,
    /// The record was no longer in the source partition; nothing was written.
    SourceMissing,
    /// The record left the source but the target already held the key.
    TargetOccupied,
}

/// A partitioned key-value store holding URL records.
///
/// Each [`RecordState`] maps to its own partition. Every method performs a
/// single attempt against the backend and never retries.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Fetches the record stored under `key` in the `state` partition.
    async fn get(&self, state: RecordState, key: &ShortKey) -> Result<Option<UrlRecord>>;

    /// Idempotent upsert into the `state` partition.
    async fn put(&self, state: RecordState, record: &UrlRecord) -> Result<()>;

    /// Inserts only if the key is absent from the `state` partition.
    async fn insert_exclusive(&self, state: RecordState, record: &UrlRecord)
        -> Result<InsertOutcome>;

    /// Removes the record. Returns `true` if it existed.
    async fn delete(&self, state: RecordState, key: &ShortKey) -> Result<bool>;

    /// Sets `last_accessed_at` on the record under `key` if it is still in
    /// the `state` partition. Never creates a record. Returns `true` if a
    /// record was updated.
    async fn touch(&self, state: RecordState, key: &ShortKey, at: Timestamp) -> Result<bool>;

    /// Reads one page of records from the `state` partition matching `filter`.
    async fn scan_page(
        &self,
        state: RecordState,
        filter: &RecordFilter,
        token: Option<ContinuationToken>,
    ) -> Result<RecordPage>;

    /// Moves `record` from the opposite partition into `record.state`.
    ///
    /// The default is delete-then-insert and is NOT atomic: a failure after
    /// the delete leaves the record in neither partition. Backends able to
    /// move in one operation should override this.
    async fn move_record(&self, record: &UrlRecord) -> Result<MoveOutcome> {
        let from = record.state.opposite();
        if !self.delete(from, &record.short_key).await? {
            return Ok(MoveOutcome::SourceMissing);
        }
        match self.insert_exclusive(record.state, record).await? {
            InsertOutcome::Inserted => Ok(MoveOutcome::Moved),
            InsertOutcome::AlreadyExists => Ok(MoveOutcome::TargetOccupied),
        }
    }
}

/// Cursor over the pages of a scan.
enum Cursor {
    Start,
    Next(ContinuationToken),
    Done,
}

/// Streaming helpers available on every [`RecordStore`].
pub trait RecordStoreExt: RecordStore {
    /// Scans a partition, following continuation tokens until exhausted.
    ///
    /// Pages are fetched lazily as the stream is polled.
    fn scan(&self, state: RecordState, filter: RecordFilter) -> RecordStream<'_> {
        stream::try_unfold(Cursor::Start, move |cursor| {
            let filter = filter.clone();
            async move {
                let token = match cursor {
                    Cursor::Start => None,
                    Cursor::Next(token) => Some(token),
                    Cursor::Done => return Ok(None),
                };
                let page = self.scan_page(state, &filter, token).await?;
                let next = match page.next_token {
                    Some(token) => Cursor::Next(token),
                    None => Cursor::Done,
                };
                let records = stream::iter(page.records.into_iter().map(Ok::<_, StorageError>));
                Ok::<_, StorageError>(Some((records, next)))
            }
        })
        .try_flatten()
        .boxed()
    }

    /// Collects a full scan into memory.
    fn scan_all(
        &self,
        state: RecordState,
        filter: RecordFilter,
    ) -> BoxFuture<'_, Result<Vec<UrlRecord>>> {
        self.scan(state, filter).try_collect().boxed()
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}
