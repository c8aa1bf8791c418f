use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request payload grouped by protocol section (`"POST"`, `"GET"`, `"COOKIE"`, ...),
/// each section mapping field names to their raw string values.
pub type RequestData = BTreeMap<String, BTreeMap<String, String>>;

/// Backend-assigned identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Fresh random identifier, used by the bundled backends on insert.
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId(value)
    }
}

/// One intercepted request awaiting, or having completed, security analysis.
///
/// The serialized form is the record representation exchanged with the
/// interception and analysis layers and is identical for every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub data: RequestData,
    pub remote_ip: String,
    #[serde(rename = "datetime", with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub processed: bool,
}

impl Record {
    pub fn is_pending(&self) -> bool {
        !self.processed
    }
}

/// Intake payload for a record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub data: RequestData,
    pub remote_ip: String,
    #[serde(rename = "datetime", with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl NewRecord {
    /// Empty payload from `remote_ip`, stamped with the current time.
    ///
    /// Timestamps are kept at whole-second precision, the resolution of the
    /// serialized form.
    pub fn new<S: Into<String>>(remote_ip: S) -> Self {
        Self {
            data: RequestData::new(),
            remote_ip: remote_ip.into(),
            timestamp: Utc::now().trunc_subsecs(0),
        }
    }

    pub fn with_field<S, N, V>(mut self, section: S, name: N, value: V) -> Self
    where
        S: Into<String>,
        N: Into<String>,
        V: Into<String>,
    {
        self.data
            .entry(section.into())
            .or_default()
            .insert(name.into(), value.into());
        self
    }

    pub fn with_data(mut self, data: RequestData) -> Self {
        self.data = data;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.trunc_subsecs(0);
        self
    }

    /// Materialize the stored record; new records always start unprocessed.
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            data: self.data,
            remote_ip: self.remote_ip,
            timestamp: self.timestamp,
            processed: false,
        }
    }
}

/// Field predicate handed to a collection's `find`.
///
/// Unset fields match everything; `limit` caps the number of records
/// returned after the other criteria are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub processed: Option<bool>,
    pub remote_ip: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(processed) = self.processed {
            if record.processed != processed {
                return false;
            }
        }
        if let Some(ref ip) = self.remote_ip {
            if &record.remote_ip != ip {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_record_collects_fields_by_section() {
        let record = NewRecord::new("127.0.0.1")
            .with_field("POST", "test", "foo")
            .with_field("POST", "other", "bar")
            .with_field("COOKIE", "sid", "42");
        assert_eq!(record.data.len(), 2);
        assert_eq!(record.data["POST"]["test"], "foo");
        assert_eq!(record.data["POST"]["other"], "bar");
        assert_eq!(record.data["COOKIE"]["sid"], "42");
        assert_eq!(record.timestamp.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_into_record_starts_unprocessed() {
        let record = NewRecord::new("10.0.0.1").into_record(RecordId::from("1"));
        assert!(record.is_pending());
        assert_eq!(record.id.as_str(), "1");
    }

    #[test]
    fn test_record_wire_format() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let record = NewRecord::new("127.0.0.1")
            .with_field("POST", "test", "foo")
            .at(ts)
            .into_record(RecordId::from("12345"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "_id": "12345",
                "data": { "POST": { "test": "foo" } },
                "remote_ip": "127.0.0.1",
                "datetime": ts.timestamp(),
                "processed": false
            })
        );
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_filter_matches_each_criterion() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut record = NewRecord::new("192.168.1.10")
            .at(ts)
            .into_record(RecordId::generate());

        assert!(RecordFilter::default().matches(&record));
        assert!(RecordFilter { processed: Some(false), ..Default::default() }.matches(&record));
        assert!(!RecordFilter { processed: Some(true), ..Default::default() }.matches(&record));
        assert!(!RecordFilter { remote_ip: Some("10.0.0.1".into()), ..Default::default() }
            .matches(&record));
        assert!(RecordFilter { since: Some(ts), ..Default::default() }.matches(&record));
        assert!(!RecordFilter {
            since: Some(ts + chrono::Duration::seconds(1)),
            ..Default::default()
        }
        .matches(&record));

        record.processed = true;
        assert!(!RecordFilter { processed: Some(false), ..Default::default() }.matches(&record));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }
}
