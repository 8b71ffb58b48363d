use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use littleurl_core::repository::{
    ContinuationToken, InsertOutcome, RecordFilter, RecordPage, RecordStore, Result,
};
use littleurl_core::{RecordState, ShortKey, UrlRecord};

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// In-memory implementation of [`RecordStore`] using one DashMap per state.
///
/// Scans are paginated in key order; the continuation token is the last key
/// of the previous page.
#[derive(Debug, Clone)]
pub struct InMemoryRecordStore {
    active: DashMap<ShortKey, UrlRecord>,
    deleted: DashMap<ShortKey, UrlRecord>,
    page_size: usize,
}

impl InMemoryRecordStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates a store that returns at most `page_size` records per scan page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            active: DashMap::new(),
            deleted: DashMap::new(),
            page_size: page_size.max(1),
        }
    }

    /// Number of records in a partition.
    pub fn len(&self, state: RecordState) -> usize {
        self.partition(state).len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.deleted.is_empty()
    }

    fn partition(&self, state: RecordState) -> &DashMap<ShortKey, UrlRecord> {
        match state {
            RecordState::Active => &self.active,
            RecordState::Deleted => &self.deleted,
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn stored(state: RecordState, record: &UrlRecord) -> UrlRecord {
    let mut record = record.clone();
    record.state = state;
    record
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, state: RecordState, key: &ShortKey) -> Result<Option<UrlRecord>> {
        Ok(self
            .partition(state)
            .get(key)
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, state: RecordState, record: &UrlRecord) -> Result<()> {
        self.partition(state)
            .insert(record.short_key.clone(), stored(state, record));
        Ok(())
    }

    async fn insert_exclusive(
        &self,
        state: RecordState,
        record: &UrlRecord,
    ) -> Result<InsertOutcome> {
        match self.partition(state).entry(record.short_key.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(stored(state, record));
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn delete(&self, state: RecordState, key: &ShortKey) -> Result<bool> {
        Ok(self.partition(state).remove(key).is_some())
    }

    async fn touch(&self, state: RecordState, key: &ShortKey, at: Timestamp) -> Result<bool> {
        match self.partition(state).get_mut(key) {
            Some(mut entry) => {
                entry.last_accessed_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn scan_page(
        &self,
        state: RecordState,
        filter: &RecordFilter,
        token: Option<ContinuationToken>,
    ) -> Result<RecordPage> {
        let after = token.map(|token| ShortKey::new_unchecked(token.as_str()));

        let mut matching: Vec<UrlRecord> = self
            .partition(state)
            .iter()
            .filter(|entry| after.as_ref().is_none_or(|after| entry.key() > after))
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| a.short_key.cmp(&b.short_key));

        let next_token = if matching.len() > self.page_size {
            matching.truncate(self.page_size);
            matching
                .last()
                .map(|last| ContinuationToken::new(last.short_key.as_str()))
        } else {
            None
        };

        Ok(RecordPage {
            records: matching,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use jiff::SignedDuration;
    use littleurl_core::{MoveOutcome, RecordStoreExt};

    fn key(s: &str) -> ShortKey {
        ShortKey::new_unchecked(s)
    }

    fn record(k: &str, url: &str) -> UrlRecord {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        UrlRecord::new_active(key(k), url, 1, now)
    }

    #[tokio::test]
    async fn put_and_get() {
        let store = InMemoryRecordStore::new();

        store
            .put(RecordState::Active, &record("ab1", "http://x.com"))
            .await
            .unwrap();

        let got = store
            .get(RecordState::Active, &key("ab1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.long_url, "http://x.com");
        assert!(store
            .get(RecordState::Deleted, &key("ab1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn put_overwrites() {
        let store = InMemoryRecordStore::new();

        store
            .put(RecordState::Active, &record("ab1", "http://one.com"))
            .await
            .unwrap();
        store
            .put(RecordState::Active, &record("ab1", "http://two.com"))
            .await
            .unwrap();

        let got = store
            .get(RecordState::Active, &key("ab1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.long_url, "http://two.com");
        assert_eq!(store.len(RecordState::Active), 1);
    }

    #[tokio::test]
    async fn put_stamps_partition_state() {
        let store = InMemoryRecordStore::new();

        store
            .put(RecordState::Deleted, &record("ab1", "http://x.com"))
            .await
            .unwrap();

        let got = store
            .get(RecordState::Deleted, &key("ab1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.state, RecordState::Deleted);
    }

    #[tokio::test]
    async fn insert_exclusive_conflict() {
        let store = InMemoryRecordStore::new();

        let first = store
            .insert_exclusive(RecordState::Active, &record("ab1", "http://one.com"))
            .await
            .unwrap();
        let second = store
            .insert_exclusive(RecordState::Active, &record("ab1", "http://two.com"))
            .await
            .unwrap();

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::AlreadyExists);
        let got = store
            .get(RecordState::Active, &key("ab1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.long_url, "http://one.com");
    }

    #[tokio::test]
    async fn delete_existing_and_missing() {
        let store = InMemoryRecordStore::new();
        store
            .put(RecordState::Active, &record("ab1", "http://x.com"))
            .await
            .unwrap();

        assert!(store.delete(RecordState::Active, &key("ab1")).await.unwrap());
        assert!(!store.delete(RecordState::Active, &key("ab1")).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn touch_updates_only_existing_records() {
        let store = InMemoryRecordStore::new();
        let later = Timestamp::from_second(1_800_000_000).unwrap();
        store
            .put(RecordState::Active, &record("ab1", "http://x.com"))
            .await
            .unwrap();

        assert!(store
            .touch(RecordState::Active, &key("ab1"), later)
            .await
            .unwrap());
        let got = store
            .get(RecordState::Active, &key("ab1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.last_accessed_at, later);

        assert!(!store
            .touch(RecordState::Deleted, &key("ab1"), later)
            .await
            .unwrap());
        assert!(!store
            .touch(RecordState::Active, &key("nop"), later)
            .await
            .unwrap());
        assert_eq!(store.len(RecordState::Deleted), 0);
        assert_eq!(store.len(RecordState::Active), 1);
    }

    #[tokio::test]
    async fn scan_follows_continuation_tokens() {
        let store = InMemoryRecordStore::with_page_size(2);
        for i in 0..7 {
            store
                .put(
                    RecordState::Active,
                    &record(&format!("k{i:02}"), &format!("http://{i}.com")),
                )
                .await
                .unwrap();
        }

        let first = store
            .scan_page(RecordState::Active, &RecordFilter::All, None)
            .await
            .unwrap();
        assert_eq!(first.records.len(), 2);
        assert!(first.next_token.is_some());

        let keys: Vec<String> = store
            .scan(RecordState::Active, RecordFilter::All)
            .map_ok(|r| r.short_key.to_string())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, vec!["k00", "k01", "k02", "k03", "k04", "k05", "k06"]);
    }

    #[tokio::test]
    async fn scan_applies_filter() {
        let store = InMemoryRecordStore::with_page_size(1);
        store
            .put(RecordState::Active, &record("ab1", "http://x.com"))
            .await
            .unwrap();
        store
            .put(RecordState::Active, &record("ab2", "http://y.com"))
            .await
            .unwrap();
        store
            .put(RecordState::Active, &record("ab3", "http://x.com"))
            .await
            .unwrap();

        let found = store
            .scan_all(
                RecordState::Active,
                RecordFilter::LongUrl("http://x.com".to_string()),
            )
            .await
            .unwrap();
        let keys: Vec<&str> = found.iter().map(|r| r.short_key.as_str()).collect();
        assert_eq!(keys, vec!["ab1", "ab3"]);
    }

    #[tokio::test]
    async fn scan_purge_due() {
        let store = InMemoryRecordStore::new();
        let now = Timestamp::from_second(1_700_000_000).unwrap();

        let mut due = record("ab1", "http://x.com");
        due.mark_deleted(now, now - SignedDuration::from_secs(1));
        let mut later = record("ab2", "http://y.com");
        later.mark_deleted(now, now + SignedDuration::from_hours(1));
        store.put(RecordState::Deleted, &due).await.unwrap();
        store.put(RecordState::Deleted, &later).await.unwrap();

        let found = store
            .scan_all(RecordState::Deleted, RecordFilter::PurgeDue(now))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].short_key.as_str(), "ab1");
    }

    #[tokio::test]
    async fn scan_empty_partition() {
        let store = InMemoryRecordStore::new();
        let found = store
            .scan_all(RecordState::Deleted, RecordFilter::All)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn move_record_between_partitions() {
        let store = InMemoryRecordStore::new();
        let mut rec = record("ab1", "http://x.com");
        store.put(RecordState::Active, &rec).await.unwrap();

        let now = Timestamp::from_second(1_700_000_000).unwrap();
        rec.mark_deleted(now, now + SignedDuration::from_hours(24));
        assert_eq!(store.move_record(&rec).await.unwrap(), MoveOutcome::Moved);

        assert_eq!(store.len(RecordState::Active), 0);
        assert_eq!(store.len(RecordState::Deleted), 1);

        // A second move finds nothing left in the source partition.
        assert_eq!(
            store.move_record(&rec).await.unwrap(),
            MoveOutcome::SourceMissing
        );
    }

    #[tokio::test]
    async fn move_record_into_occupied_target() {
        let store = InMemoryRecordStore::new();
        let mut rec = record("ab1", "http://x.com");
        store.put(RecordState::Active, &rec).await.unwrap();

        let now = Timestamp::from_second(1_700_000_000).unwrap();
        rec.mark_deleted(now, now + SignedDuration::from_hours(24));
        store.put(RecordState::Deleted, &rec).await.unwrap();

        assert_eq!(
            store.move_record(&rec).await.unwrap(),
            MoveOutcome::TargetOccupied
        );
        assert_eq!(store.len(RecordState::Active), 0);
        assert_eq!(store.len(RecordState::Deleted), 1);
    }

    #[tokio::test]
    async fn concurrent_access() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryRecordStore::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let rec = record(&format!("c{i:02}"), &format!("http://example{i}.com"));
                store.put(RecordState::Active, &rec).await.unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let all = store
            .scan_all(RecordState::Active, RecordFilter::All)
            .await
            .unwrap();
        assert_eq!(all.len(), 10);
    }
}
