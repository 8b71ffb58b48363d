//! Record store backends.
//!
//! Both backends implement [`RecordStore`] with one partition per
//! [`RecordState`](littleurl_core::RecordState).

pub mod memory;
pub mod mysql;

pub use littleurl_core::repository::{RecordStore, RecordStoreExt};
pub use littleurl_core::StorageError;
pub use memory::InMemoryRecordStore;
pub use mysql::MySqlRecordStore;
