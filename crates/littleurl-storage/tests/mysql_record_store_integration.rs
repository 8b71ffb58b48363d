//! Integration tests for the MySQL record store.
//!
//! These start a MySQL container and therefore need a docker daemon:
//! `cargo test -p littleurl-storage -- --ignored`.

use futures::TryStreamExt;
use jiff::{SignedDuration, Timestamp};
use littleurl_core::{
    InsertOutcome, MoveOutcome, RecordFilter, RecordState, RecordStoreExt, ShortKey, UrlRecord,
};
use littleurl_storage::{MySqlRecordStore, RecordStore};
use littleurl_test_infra::{MySqlContainer, MySqlOptions};

struct Fixture {
    _mysql: MySqlContainer,
    store: MySqlRecordStore,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlContainer::start(MySqlOptions::default())
            .await
            .expect("start mysql");
        let pool = mysql.pool().await.expect("connect mysql");

        let store = MySqlRecordStore::new(pool, "little_urls").expect("table name");
        store.ensure_schema().await.expect("create schema");

        Self {
            _mysql: mysql,
            store,
        }
    }
}

fn key(value: &str) -> ShortKey {
    ShortKey::new_unchecked(value)
}

fn record(k: &str, url: &str) -> UrlRecord {
    let now = Timestamp::from_millisecond(1_700_000_000_123).unwrap();
    UrlRecord::new_active(key(k), url, 7, now)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn put_and_get_round_trips_fields() {
    let fixture = Fixture::start().await;
    let rec = record("ab1", "https://example.com");

    fixture.store.put(RecordState::Active, &rec).await.unwrap();

    let got = fixture
        .store
        .get(RecordState::Active, &key("ab1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got, rec);
    assert!(fixture
        .store
        .get(RecordState::Deleted, &key("ab1"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn insert_exclusive_reports_existing_key() {
    let fixture = Fixture::start().await;

    let first = fixture
        .store
        .insert_exclusive(RecordState::Active, &record("ab1", "https://one.example"))
        .await
        .unwrap();
    let second = fixture
        .store
        .insert_exclusive(RecordState::Active, &record("ab1", "https://two.example"))
        .await
        .unwrap();

    assert_eq!(first, InsertOutcome::Inserted);
    assert_eq!(second, InsertOutcome::AlreadyExists);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn move_record_is_a_single_update() {
    let fixture = Fixture::start().await;
    let mut rec = record("ab1", "https://example.com");
    fixture.store.put(RecordState::Active, &rec).await.unwrap();

    let now = Timestamp::from_millisecond(1_700_000_100_000).unwrap();
    rec.mark_deleted(now, now + SignedDuration::from_hours(24));
    let outcome = fixture.store.move_record(&rec).await.unwrap();
    assert_eq!(outcome, MoveOutcome::Moved);

    let moved = fixture
        .store
        .get(RecordState::Deleted, &key("ab1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved, rec);
    assert!(fixture
        .store
        .get(RecordState::Active, &key("ab1"))
        .await
        .unwrap()
        .is_none());

    let again = fixture.store.move_record(&rec).await.unwrap();
    assert_eq!(again, MoveOutcome::SourceMissing);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn scan_filters_and_pages() {
    let fixture = Fixture::start().await;
    let now = Timestamp::from_millisecond(1_700_000_000_000).unwrap();

    for i in 0..3 {
        let mut rec = record(&format!("d{i:02}"), "https://deleted.example");
        let purge_at = if i == 0 {
            now + SignedDuration::from_hours(1)
        } else {
            now - SignedDuration::from_hours(1)
        };
        rec.mark_deleted(now, purge_at);
        fixture.store.put(RecordState::Deleted, &rec).await.unwrap();
    }
    fixture
        .store
        .put(RecordState::Active, &record("a00", "https://deleted.example"))
        .await
        .unwrap();

    let due: Vec<UrlRecord> = fixture
        .store
        .scan(RecordState::Deleted, RecordFilter::PurgeDue(now))
        .try_collect()
        .await
        .unwrap();
    let keys: Vec<&str> = due.iter().map(|r| r.short_key.as_str()).collect();
    assert_eq!(keys, vec!["d01", "d02"]);

    let by_url = fixture
        .store
        .scan_all(
            RecordState::Active,
            RecordFilter::LongUrl("https://deleted.example".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(by_url.len(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn long_url_filter_is_case_sensitive() {
    let fixture = Fixture::start().await;
    fixture
        .store
        .put(RecordState::Active, &record("ab1", "https://x.com/abc"))
        .await
        .unwrap();

    let other_case = fixture
        .store
        .scan_all(
            RecordState::Active,
            RecordFilter::LongUrl("https://x.com/AbC".to_string()),
        )
        .await
        .unwrap();
    assert!(other_case.is_empty());

    let exact = fixture
        .store
        .scan_all(
            RecordState::Active,
            RecordFilter::LongUrl("https://x.com/abc".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(exact.len(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn touch_never_creates_records() {
    let fixture = Fixture::start().await;
    let later = Timestamp::from_millisecond(1_700_000_500_000).unwrap();
    fixture
        .store
        .put(RecordState::Active, &record("ab1", "https://example.com"))
        .await
        .unwrap();

    assert!(fixture
        .store
        .touch(RecordState::Active, &key("ab1"), later)
        .await
        .unwrap());
    let got = fixture
        .store
        .get(RecordState::Active, &key("ab1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.last_accessed_at, later);

    assert!(!fixture
        .store
        .touch(RecordState::Deleted, &key("ab1"), later)
        .await
        .unwrap());
    assert!(fixture
        .store
        .get(RecordState::Deleted, &key("ab1"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn rejects_unsafe_table_names() {
    let fixture = Fixture::start().await;
    let pool = fixture.store.pool().clone();

    assert!(MySqlRecordStore::new(pool, "urls; DROP TABLE x").is_err());
}
