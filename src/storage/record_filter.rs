//! Helpers for building `RecordFilter` values.
//!
//! This module re-exports `RecordFilter` and provides convenience builders
//! for the queries the queue and its consumers issue most often.

use chrono::{DateTime, Utc};

pub use crate::storage::types::RecordFilter;

/// Records still awaiting analysis.
pub fn pending() -> RecordFilter {
    RecordFilter { processed: Some(false), ..Default::default() }
}

/// Records whose analysis has completed.
pub fn processed() -> RecordFilter {
    RecordFilter { processed: Some(true), ..Default::default() }
}

/// Records originating from the exact textual address `ip`.
pub fn by_remote_ip<S: Into<String>>(ip: S) -> RecordFilter {
    RecordFilter { remote_ip: Some(ip.into()), ..Default::default() }
}

/// Records created at or after `since`.
pub fn created_since(since: DateTime<Utc>) -> RecordFilter {
    RecordFilter { since: Some(since), ..Default::default() }
}

impl RecordFilter {
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn from_ip<S: Into<String>>(mut self, ip: S) -> Self {
        self.remote_ip = Some(ip.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}
