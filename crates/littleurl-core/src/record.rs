use crate::shortkey::ShortKey;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lifecycle state of a URL record.
///
/// Stores keep one partition per state. The partition discriminator is the
/// string `"True"` for active records and `"False"` for deleted ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    Active,
    Deleted,
}

impl RecordState {
    /// Selects the state matching a `want_deleted` lookup flag.
    pub fn from_deleted_flag(deleted: bool) -> Self {
        if deleted {
            Self::Deleted
        } else {
            Self::Active
        }
    }

    pub fn is_deleted(self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// The partition discriminator persisted by stores.
    pub fn partition_key(self) -> &'static str {
        match self {
            Self::Active => "True",
            Self::Deleted => "False",
        }
    }

    /// Parses a persisted partition discriminator.
    pub fn from_partition_key(value: &str) -> Option<Self> {
        match value {
            "True" => Some(Self::Active),
            "False" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// The state a move out of this state lands in.
    pub fn opposite(self) -> Self {
        match self {
            Self::Active => Self::Deleted,
            Self::Deleted => Self::Active,
        }
    }
}

impl Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Deleted => f.write_str("deleted"),
        }
    }
}

/// A short key to long URL mapping together with its lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub short_key: ShortKey,
    pub long_url: String,
    /// Stable display id, assigned once at creation.
    pub url_id: u64,
    pub created_at: Timestamp,
    pub last_accessed_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
    pub purge_at: Option<Timestamp>,
    pub state: RecordState,
}

impl UrlRecord {
    /// Builds a fresh active record. `last_accessed_at` starts at the creation
    /// time so an unread record still ages out through the retention sweep.
    pub fn new_active(
        short_key: ShortKey,
        long_url: impl Into<String>,
        url_id: u64,
        now: Timestamp,
    ) -> Self {
        Self {
            short_key,
            long_url: long_url.into(),
            url_id,
            created_at: now,
            last_accessed_at: now,
            deleted_at: None,
            purge_at: None,
            state: RecordState::Active,
        }
    }

    /// Marks the record deleted at `now`, scheduled for purge at `purge_at`.
    pub fn mark_deleted(&mut self, now: Timestamp, purge_at: Timestamp) {
        self.state = RecordState::Deleted;
        self.deleted_at = Some(now);
        self.purge_at = Some(purge_at);
    }

    /// Brings the record back to the active state and clears deletion marks.
    pub fn mark_restored(&mut self) {
        self.state = RecordState::Active;
        self.deleted_at = None;
        self.purge_at = None;
    }

    /// Returns `true` once the record's purge deadline has been reached.
    pub fn is_purge_due(&self, now: Timestamp) -> bool {
        self.state.is_deleted() && self.purge_at.is_some_and(|purge_at| purge_at <= now)
    }
}
