//! Lifecycle engine and service facade for littleurl records.
//!
//! The [`LifecycleEngine`] owns the record state machine: deduplicating
//! creation, moves between the active and deleted partitions, and the
//! opportunistic retention and purge sweeps piggybacked on lookups.
//! [`LittleUrlService`] wraps it behind the [`LittleUrl`](littleurl_core::LittleUrl)
//! facade consumed by the HTTP layer.

pub mod engine;
pub mod error;
pub mod ids;
pub mod retention;
pub mod service;
pub mod sweep;

pub use engine::LifecycleEngine;
pub use error::LifecycleError;
pub use service::LittleUrlService;
pub use sweep::{SweepGate, SweepKind, SweepReport};
