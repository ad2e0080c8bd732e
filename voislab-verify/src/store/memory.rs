//! In-memory stores
//!
//! Behave like the DynamoDB and S3 stores (full-key updates, prefix
//! listing) and allow failures to be injected per track or per key.

use super::{CorrectableField, FieldValue, MediaStore, MetadataStore, StoredObject};
use crate::error::{VerifyError, VerifyResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use voislab_common::{RecordKey, TrackMetadataRecord};

/// Metadata table held in memory
#[derive(Default)]
pub struct MemoryMetadataStore {
    records: Mutex<Vec<TrackMetadataRecord>>,
    failing_updates: Mutex<HashSet<String>>,
    unreachable: bool,
}

impl MemoryMetadataStore {
    pub fn new(records: Vec<TrackMetadataRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    /// A store whose every call fails, like a missing table
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    /// Make updates to this track fail
    pub fn fail_updates_for(&self, id: &str) {
        lock(&self.failing_updates).insert(id.to_string());
    }

    /// Current contents of the table
    pub fn records(&self) -> Vec<TrackMetadataRecord> {
        lock(&self.records).clone()
    }

    /// Replace a record wholesale (used to restore backups)
    pub fn put(&self, record: TrackMetadataRecord) {
        let mut records = lock(&self.records);
        match records
            .iter_mut()
            .find(|r| r.id == record.id && r.created_date == record.created_date)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    fn check_reachable(&self) -> VerifyResult<()> {
        if self.unreachable {
            return Err(VerifyError::MetadataStore(
                "Requested resource not found".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn scan_all(&self) -> VerifyResult<Vec<TrackMetadataRecord>> {
        self.check_reachable()?;
        Ok(self.records())
    }

    async fn get_by_id(&self, id: &str) -> VerifyResult<Option<TrackMetadataRecord>> {
        self.check_reachable()?;
        Ok(lock(&self.records).iter().find(|r| r.id == id).cloned())
    }

    async fn update_field(
        &self,
        key: &RecordKey,
        field: CorrectableField,
        value: &FieldValue,
    ) -> VerifyResult<()> {
        self.check_reachable()?;
        if lock(&self.failing_updates).contains(&key.id) {
            return Err(VerifyError::MetadataStore(format!(
                "Conditional update rejected for {}",
                key.id
            )));
        }

        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.id == key.id && r.created_date.as_deref() == Some(key.created_date.as_str()))
            .ok_or_else(|| {
                VerifyError::MetadataStore(format!(
                    "No item with key ({}, {})",
                    key.id, key.created_date
                ))
            })?;

        match (field, value) {
            (CorrectableField::Title, FieldValue::Text(s)) => record.title = Some(s.clone()),
            (CorrectableField::FileHash, FieldValue::Text(s)) => record.file_hash = Some(s.clone()),
            (CorrectableField::Duration, FieldValue::Number(n)) => record.duration = Some(*n),
            (field, value) => {
                // Mirrors DynamoDB: the attribute takes whatever type was sent
                let json = match value {
                    FieldValue::Number(n) => Value::from(*n),
                    FieldValue::Text(s) => Value::String(s.clone()),
                };
                let mut item = serde_json::to_value(&*record)?;
                if let Value::Object(map) = &mut item {
                    map.insert(field.attribute().to_string(), json);
                }
                *record = TrackMetadataRecord::from_json(item)?;
            }
        }
        Ok(())
    }
}

/// Media bucket held in memory
#[derive(Default)]
pub struct MemoryMediaStore {
    objects: BTreeMap<String, Vec<u8>>,
    failing_downloads: HashSet<String>,
    downloads: Mutex<usize>,
    unreachable: bool,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails, like a missing bucket
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn with_object(mut self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.objects.insert(key.into(), bytes.into());
        self
    }

    /// Make downloads of this key fail
    pub fn with_failing_download(mut self, key: impl Into<String>) -> Self {
        self.failing_downloads.insert(key.into());
        self
    }

    /// Number of downloads attempted so far
    pub fn download_count(&self) -> usize {
        *lock(&self.downloads)
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn list_objects(&self, prefix: &str) -> VerifyResult<Vec<StoredObject>> {
        if self.unreachable {
            return Err(VerifyError::MediaStore("NoSuchBucket".to_string()));
        }
        Ok(self
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, bytes)| StoredObject::new(key.clone(), bytes.len() as u64))
            .collect())
    }

    async fn download(&self, key: &str, dest: &Path) -> VerifyResult<u64> {
        *lock(&self.downloads) += 1;
        if self.unreachable || self.failing_downloads.contains(key) {
            return Err(VerifyError::MediaStore(format!("Failed to download {}", key)));
        }
        let bytes = self
            .objects
            .get(key)
            .ok_or_else(|| VerifyError::MediaStore(format!("NoSuchKey: {}", key)))?;
        tokio::fs::write(dest, bytes).await?;
        Ok(bytes.len() as u64)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> TrackMetadataRecord {
        TrackMetadataRecord::new(id, "2025-01-01")
    }

    #[tokio::test]
    async fn test_update_requires_full_key() {
        let store = MemoryMetadataStore::new(vec![record("a")]);
        let wrong_key = RecordKey {
            id: "a".into(),
            created_date: "1999-01-01".into(),
        };
        let result = store
            .update_field(&wrong_key, CorrectableField::Title, &FieldValue::Text("X".into()))
            .await;
        assert!(result.is_err());

        let key = record("a").key().unwrap();
        store
            .update_field(&key, CorrectableField::Duration, &FieldValue::Number(99))
            .await
            .unwrap();
        assert_eq!(store.records()[0].duration, Some(99));
    }

    #[tokio::test]
    async fn test_listing_filters_by_prefix() {
        let store = MemoryMediaStore::new()
            .with_object("audio/a/x.wav", vec![0u8; 4])
            .with_object("artwork/a/cover.jpg", vec![0u8; 2]);
        let objects = store.list_objects("audio/").await.unwrap();
        assert_eq!(objects, vec![StoredObject::new("audio/a/x.wav", 4)]);
    }

    #[tokio::test]
    async fn test_failing_download_is_counted() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryMediaStore::new()
            .with_object("audio/a/x.wav", b"abc".to_vec())
            .with_failing_download("audio/a/x.wav");
        let result = store.download("audio/a/x.wav", &dir.path().join("x")).await;
        assert!(result.is_err());
        assert_eq!(store.download_count(), 1);
    }
}
