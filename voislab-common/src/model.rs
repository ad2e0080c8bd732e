//! Track metadata record model
//!
//! One record per track in the metadata table, keyed by (`id`, `createdDate`).
//! Attribute names follow the table's camelCase convention. Attributes this
//! model does not name are kept in [`TrackMetadataRecord::extra`] so that a
//! serialized record is a complete snapshot of the stored item.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Processing status written by the upload pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrackStatus {
    Processed,
    Enhanced,
    Failed,
    Other(String),
}

impl TrackStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TrackStatus::Processed => "processed",
            TrackStatus::Enhanced => "enhanced",
            TrackStatus::Failed => "failed",
            TrackStatus::Other(s) => s,
        }
    }
}

impl From<String> for TrackStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "processed" => TrackStatus::Processed,
            "enhanced" => TrackStatus::Enhanced,
            "failed" => TrackStatus::Failed,
            _ => TrackStatus::Other(s),
        }
    }
}

impl From<&str> for TrackStatus {
    fn from(s: &str) -> Self {
        TrackStatus::from(s.to_string())
    }
}

impl From<TrackStatus> for String {
    fn from(status: TrackStatus) -> Self {
        match status {
            TrackStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full composite key of a metadata record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub id: String,
    pub created_date: String,
}

/// Track metadata record as stored in the metadata table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredItem", into = "StoredItem")]
pub struct TrackMetadataRecord {
    pub id: String,

    /// Sort key; required for any update
    pub created_date: Option<String>,

    pub title: Option<String>,

    /// Duration in whole seconds
    pub duration: Option<i64>,

    pub genre: Option<String>,

    pub filename: Option<String>,

    /// SHA-256 hex digest of the media file
    pub file_hash: Option<String>,

    pub status: Option<TrackStatus>,

    pub error_message: Option<String>,

    /// Every other stored attribute, untouched
    pub extra: Map<String, Value>,

    /// Stored duration when it was not a plain integer (float or string)
    raw_duration: Option<Value>,
}

/// Wire shape of a table item
#[derive(Serialize, Deserialize)]
struct StoredItem {
    id: String,

    #[serde(rename = "createdDate", default, skip_serializing_if = "Option::is_none")]
    created_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    genre: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,

    #[serde(rename = "fileHash", default, skip_serializing_if = "Option::is_none")]
    file_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<TrackStatus>,

    #[serde(rename = "errorMessage", default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<StoredItem> for TrackMetadataRecord {
    fn from(item: StoredItem) -> Self {
        let duration = item.duration.as_ref().and_then(seconds_from_value);
        let raw_duration = item.duration.filter(|v| !v.is_i64());
        Self {
            id: item.id,
            created_date: item.created_date,
            title: item.title,
            duration,
            genre: item.genre,
            filename: item.filename,
            file_hash: item.file_hash,
            status: item.status,
            error_message: item.error_message,
            extra: item.extra,
            raw_duration,
        }
    }
}

impl From<TrackMetadataRecord> for StoredItem {
    fn from(record: TrackMetadataRecord) -> Self {
        // The stored encoding survives until the seconds value changes
        let duration = match record.raw_duration {
            Some(raw) if seconds_from_value(&raw) == record.duration => Some(raw),
            _ => record.duration.map(Value::from),
        };
        Self {
            id: record.id,
            created_date: record.created_date,
            title: record.title,
            duration,
            genre: record.genre,
            filename: record.filename,
            file_hash: record.file_hash,
            status: record.status,
            error_message: record.error_message,
            extra: record.extra,
        }
    }
}

impl TrackMetadataRecord {
    /// Create a record with only the key populated
    pub fn new(id: impl Into<String>, created_date: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_date: Some(created_date.into()),
            title: None,
            duration: None,
            genre: None,
            filename: None,
            file_hash: None,
            status: None,
            error_message: None,
            extra: Map::new(),
            raw_duration: None,
        }
    }

    /// Build a record from a JSON object (one table item)
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Composite key, if the sort key is present
    pub fn key(&self) -> Option<RecordKey> {
        self.created_date.as_ref().map(|created_date| RecordKey {
            id: self.id.clone(),
            created_date: created_date.clone(),
        })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, Some(TrackStatus::Failed))
    }

    /// Filename, if present and non-blank
    pub fn filename(&self) -> Option<&str> {
        non_blank(self.filename.as_deref())
    }

    /// Genre, if present and non-blank
    pub fn genre(&self) -> Option<&str> {
        non_blank(self.genre.as_deref())
    }

    /// Stored content hash, if present and non-blank
    pub fn file_hash(&self) -> Option<&str> {
        non_blank(self.file_hash.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Whole seconds from an integer, float (truncated) or numeric-string duration
fn seconds_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}
