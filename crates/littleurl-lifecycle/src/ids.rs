use futures::TryStreamExt;
use littleurl_core::{RecordFilter, RecordState, RecordStore, RecordStoreExt, StorageError};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;
use tracing::debug;

/// Hands out monotonically increasing url ids.
///
/// The counter is seeded lazily from the highest id found in either
/// partition, so ids keep growing across restarts as long as the record
/// holding the maximum has not been purged.
#[derive(Debug, Default)]
pub struct UrlIdAllocator {
    last: OnceCell<AtomicU64>,
}

impl UrlIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id, seeding the counter from `store` on first use.
    pub async fn next_id<S: RecordStore + ?Sized>(&self, store: &S) -> Result<u64, StorageError> {
        let last = self
            .last
            .get_or_try_init(|| async {
                let mut highest = 0;
                for state in [RecordState::Active, RecordState::Deleted] {
                    highest = store
                        .scan(state, RecordFilter::All)
                        .try_fold(highest, |acc, record| async move { Ok(acc.max(record.url_id)) })
                        .await?;
                }
                debug!(highest, "seeded url id counter");
                Ok::<_, StorageError>(AtomicU64::new(highest))
            })
            .await?;

        Ok(last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;
    use littleurl_core::{ShortKey, UrlRecord};
    use littleurl_storage::InMemoryRecordStore;

    #[tokio::test]
    async fn starts_at_one_on_empty_store() {
        let store = InMemoryRecordStore::new();
        let ids = UrlIdAllocator::new();

        assert_eq!(ids.next_id(&store).await.unwrap(), 1);
        assert_eq!(ids.next_id(&store).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn seeds_from_highest_id_in_either_partition() {
        let store = InMemoryRecordStore::with_page_size(1);
        let now = Timestamp::from_second(0).unwrap();
        let active = UrlRecord::new_active(ShortKey::new_unchecked("aaa"), "http://a.com", 4, now);
        let deleted = UrlRecord::new_active(ShortKey::new_unchecked("bbb"), "http://b.com", 9, now);
        store.put(RecordState::Active, &active).await.unwrap();
        store.put(RecordState::Deleted, &deleted).await.unwrap();

        let ids = UrlIdAllocator::new();
        assert_eq!(ids.next_id(&store).await.unwrap(), 10);

        // Later records do not reseed the counter.
        let later = UrlRecord::new_active(ShortKey::new_unchecked("ccc"), "http://c.com", 50, now);
        store.put(RecordState::Active, &later).await.unwrap();
        assert_eq!(ids.next_id(&store).await.unwrap(), 11);
    }
}
