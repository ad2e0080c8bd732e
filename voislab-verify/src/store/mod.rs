//! Metadata and media store access
//!
//! The verifier talks to the metadata table and the media bucket only
//! through [`MetadataStore`] and [`MediaStore`]. Production runs use the
//! DynamoDB and S3 implementations; tests use the in-memory ones.

pub mod attributes;
pub mod dynamo;
pub mod memory;
pub mod s3;

pub use dynamo::DynamoMetadataStore;
pub use memory::{MemoryMediaStore, MemoryMetadataStore};
pub use s3::S3MediaStore;

use crate::error::VerifyResult;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use voislab_common::{RecordKey, TrackMetadataRecord};

/// Fields the corrector is allowed to rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrectableField {
    Title,
    Duration,
    FileHash,
}

impl CorrectableField {
    /// Attribute name in the metadata table
    pub fn attribute(&self) -> &'static str {
        match self {
            CorrectableField::Title => "title",
            CorrectableField::Duration => "duration",
            CorrectableField::FileHash => "fileHash",
        }
    }
}

impl fmt::Display for CorrectableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

/// New value for a corrected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Number(i64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One object in the media bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
}

impl StoredObject {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }

    /// Last path segment of the key
    pub fn basename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Track metadata table
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Every record in the table
    async fn scan_all(&self) -> VerifyResult<Vec<TrackMetadataRecord>>;

    /// Current state of the record with this id
    async fn get_by_id(&self, id: &str) -> VerifyResult<Option<TrackMetadataRecord>>;

    /// Set one field on the record identified by the full key
    async fn update_field(
        &self,
        key: &RecordKey,
        field: CorrectableField,
        value: &FieldValue,
    ) -> VerifyResult<()>;
}

/// Media object storage (read-only from this tool)
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Every object whose key starts with `prefix`
    async fn list_objects(&self, prefix: &str) -> VerifyResult<Vec<StoredObject>>;

    /// Download one object to `dest`, returning the number of bytes written
    async fn download(&self, key: &str, dest: &Path) -> VerifyResult<u64>;
}
