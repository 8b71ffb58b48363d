//! Core types and traits for the littleurl shortener.
//!
//! This crate provides the record model, the partitioned record store
//! contract and the facade trait shared by the lifecycle engine, the
//! storage backends and the HTTP gateway.

pub mod clock;
pub mod error;
pub mod record;
pub mod repository;
pub mod service;
pub mod settings;
pub mod shortkey;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, ServiceError, StorageError};
pub use record::{RecordState, UrlRecord};
pub use repository::{
    ContinuationToken, InsertOutcome, MoveOutcome, RecordFilter, RecordPage, RecordStore,
    RecordStoreExt, RecordStream,
};
pub use service::LittleUrl;
pub use settings::{CollisionPolicy, LifecycleSettings, SweepDispatch, DEFAULT_RETENTION_DAYS};
pub use shortkey::ShortKey;
