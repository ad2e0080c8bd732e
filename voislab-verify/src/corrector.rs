//! Metadata correction with backups
//!
//! Every correction re-reads the record, appends the pre-correction state to
//! the run's backup file, resolves the record's full key and only then
//! issues a single-field update. The backup file holds one JSON object per
//! line and is created on first use. A record is backed up once per run, before
//! its first correction, so replaying the file restores pre-run state even
//! when several fields of one record were corrected.

use crate::error::{VerifyError, VerifyResult};
use crate::store::{CorrectableField, FieldValue, MetadataStore};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use voislab_common::TrackMetadataRecord;

/// Append-only JSON-lines backup file
#[derive(Debug)]
pub struct BackupLog {
    path: PathBuf,
    file: Option<File>,
    entries: usize,
    backed_up: HashSet<String>,
}

impl BackupLog {
    /// Backup log at `path`; nothing is created until the first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            entries: 0,
            backed_up: HashSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries written by this run
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Whether this run already holds a backup of the track
    pub fn contains(&self, track_id: &str) -> bool {
        self.backed_up.contains(track_id)
    }

    /// Append one record and flush it to disk
    pub fn append(&mut self, record: &TrackMetadataRecord) -> VerifyResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| {
                    VerifyError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to open backup file {}: {}", self.path.display(), e),
                    ))
                })?;
            tracing::info!(path = %self.path.display(), "Created backup file");
            self.file = Some(file);
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(line.as_bytes())?;
            file.sync_data()?;
        }
        self.entries += 1;
        self.backed_up.insert(record.id.clone());
        Ok(())
    }
}

/// Load every record from a backup file
pub fn read_backup(path: &Path) -> VerifyResult<Vec<TrackMetadataRecord>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(VerifyError::from))
        .collect()
}

/// Writes corrected field values back to the metadata store
pub struct Corrector<'a> {
    store: &'a dyn MetadataStore,
    backup: BackupLog,
}

impl<'a> Corrector<'a> {
    pub fn new(store: &'a dyn MetadataStore, backup: BackupLog) -> Self {
        Self { store, backup }
    }

    pub fn backup(&self) -> &BackupLog {
        &self.backup
    }

    /// Set `field` to `value` on the record with this id
    ///
    /// The record is backed up before its first write. Errors leave the run
    /// intact; the caller logs them and moves on.
    pub async fn correct(
        &mut self,
        track_id: &str,
        field: CorrectableField,
        value: &FieldValue,
    ) -> VerifyResult<()> {
        let current = self
            .store
            .get_by_id(track_id)
            .await?
            .ok_or_else(|| VerifyError::Record(format!("Track {} not found", track_id)))?;

        if !self.backup.contains(track_id) {
            self.backup.append(&current)?;
        }

        let key = current.key().ok_or_else(|| {
            VerifyError::Record(format!("Track {} has no createdDate; cannot update", track_id))
        })?;

        self.store.update_field(&key, field, value).await?;

        tracing::info!(track_id, field = %field, value = %value, "Corrected field");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryMetadataStore;
    use tempfile::TempDir;

    fn record(id: &str) -> TrackMetadataRecord {
        let mut r = TrackMetadataRecord::new(id, "2025-03-01T10:00:00");
        r.title = Some("Old Title".into());
        r.duration = Some(100);
        r
    }

    #[tokio::test]
    async fn test_backup_written_before_update() {
        let dir = TempDir::new().unwrap();
        let store = MemoryMetadataStore::new(vec![record("t1")]);
        let backup_path = dir.path().join("backup.jsonl");
        let mut corrector = Corrector::new(&store, BackupLog::new(&backup_path));

        corrector
            .correct("t1", CorrectableField::Title, &FieldValue::Text("New Title".into()))
            .await
            .unwrap();

        let backups = read_backup(&backup_path).unwrap();
        assert_eq!(backups, vec![record("t1")]);
        assert_eq!(store.records()[0].title.as_deref(), Some("New Title"));
        assert_eq!(corrector.backup().entries(), 1);
    }

    #[tokio::test]
    async fn test_record_backed_up_once_across_fields() {
        let dir = TempDir::new().unwrap();
        let store = MemoryMetadataStore::new(vec![record("t1")]);
        let backup_path = dir.path().join("backup.jsonl");
        let mut corrector = Corrector::new(&store, BackupLog::new(&backup_path));

        corrector
            .correct("t1", CorrectableField::Title, &FieldValue::Text("New Title".into()))
            .await
            .unwrap();
        corrector
            .correct("t1", CorrectableField::Duration, &FieldValue::Number(183))
            .await
            .unwrap();

        // Only the pre-correction state, not the half-corrected one
        assert_eq!(read_backup(&backup_path).unwrap(), vec![record("t1")]);
        assert_eq!(corrector.backup().entries(), 1);
        assert_eq!(store.records()[0].title.as_deref(), Some("New Title"));
        assert_eq!(store.records()[0].duration, Some(183));
    }

    #[tokio::test]
    async fn test_duration_written_as_number() {
        let dir = TempDir::new().unwrap();
        let store = MemoryMetadataStore::new(vec![record("t1")]);
        let mut corrector = Corrector::new(&store, BackupLog::new(dir.path().join("b.jsonl")));

        corrector
            .correct("t1", CorrectableField::Duration, &FieldValue::Number(183))
            .await
            .unwrap();
        assert_eq!(store.records()[0].duration, Some(183));
    }

    #[tokio::test]
    async fn test_unknown_track_fails_without_backup() {
        let dir = TempDir::new().unwrap();
        let store = MemoryMetadataStore::new(vec![]);
        let backup_path = dir.path().join("b.jsonl");
        let mut corrector = Corrector::new(&store, BackupLog::new(&backup_path));

        let result = corrector
            .correct("ghost", CorrectableField::Title, &FieldValue::Text("X".into()))
            .await;
        assert!(result.is_err());
        assert!(!backup_path.exists());
    }

    #[tokio::test]
    async fn test_missing_sort_key_fails_after_backup() {
        let dir = TempDir::new().unwrap();
        let mut keyless = record("t1");
        keyless.created_date = None;
        let store = MemoryMetadataStore::new(vec![keyless.clone()]);
        let mut corrector = Corrector::new(&store, BackupLog::new(dir.path().join("b.jsonl")));

        let result = corrector
            .correct("t1", CorrectableField::Title, &FieldValue::Text("X".into()))
            .await;
        assert!(matches!(result, Err(VerifyError::Record(_))));
        assert_eq!(corrector.backup().entries(), 1);
        assert_eq!(store.records()[0], keyless);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_backup() {
        let dir = TempDir::new().unwrap();
        let store = MemoryMetadataStore::new(vec![record("t1")]);
        store.fail_updates_for("t1");
        let backup_path = dir.path().join("b.jsonl");
        let mut corrector = Corrector::new(&store, BackupLog::new(&backup_path));

        let result = corrector
            .correct("t1", CorrectableField::Title, &FieldValue::Text("X".into()))
            .await;
        assert!(result.is_err());
        assert_eq!(read_backup(&backup_path).unwrap().len(), 1);
        assert_eq!(store.records()[0].title.as_deref(), Some("Old Title"));
    }
}
