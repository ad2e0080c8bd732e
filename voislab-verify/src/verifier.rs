//! Per-record verification
//!
//! Compares one metadata record against its stored file and produces
//! [`Finding`]s. Check order and short-circuit rules:
//!
//! 1. `failed` records are skipped outright
//! 2. No filename: one `metadata_incomplete`, nothing else runs
//! 3. No stored file: one `missing_file`, nothing else runs
//! 4. Title, duration, hash and genre checks run independently
//!
//! Duration and hash need the file content and are skipped in
//! [`VerifyMode::Fast`]. A download, hash or probe failure means the aspect
//! could not be verified and yields no finding.

use crate::services::{calculate_hash, expected_title, DurationProbe, FileIndex};
use crate::store::{CorrectableField, FieldValue, MediaStore, StoredObject};
use std::fmt;
use std::path::{Path, PathBuf};
use voislab_common::TrackMetadataRecord;

/// Placeholder genre the upload pipeline writes before enrichment
const PLACEHOLDER_GENRE: &str = "unknown";

/// Kind of discrepancy between a record and the stored media
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FindingKind {
    TitleMismatch,
    DurationMismatch,
    GenreMismatch,
    HashMismatch,
    MissingDbEntry,
    MissingFile,
    MetadataIncomplete,
}

impl FindingKind {
    pub const ALL: [FindingKind; 7] = [
        FindingKind::TitleMismatch,
        FindingKind::DurationMismatch,
        FindingKind::GenreMismatch,
        FindingKind::HashMismatch,
        FindingKind::MissingDbEntry,
        FindingKind::MissingFile,
        FindingKind::MetadataIncomplete,
    ];

    /// Tag used in the error log
    pub fn tag(&self) -> &'static str {
        match self {
            FindingKind::TitleMismatch => "title_mismatch",
            FindingKind::DurationMismatch => "duration_mismatch",
            FindingKind::GenreMismatch => "genre_mismatch",
            FindingKind::HashMismatch => "hash_mismatch",
            FindingKind::MissingDbEntry => "missing_db_entry",
            FindingKind::MissingFile => "missing_file",
            FindingKind::MetadataIncomplete => "metadata_incomplete",
        }
    }

    /// Label used in the report breakdown
    pub fn label(&self) -> &'static str {
        match self {
            FindingKind::TitleMismatch => "Title Mismatch",
            FindingKind::DurationMismatch => "Duration Mismatch",
            FindingKind::GenreMismatch => "Genre Mismatch",
            FindingKind::HashMismatch => "Hash Mismatch",
            FindingKind::MissingDbEntry => "Missing DB Entry",
            FindingKind::MissingFile => "Missing File",
            FindingKind::MetadataIncomplete => "Incomplete Metadata",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Value the corrector should write to fix a finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub field: CorrectableField,
    pub value: FieldValue,
}

/// One detected discrepancy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub track_id: String,
    pub message: String,
    /// Present when the finding can be fixed automatically
    pub correction: Option<Correction>,
}

impl Finding {
    pub fn new(kind: FindingKind, track_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            track_id: track_id.into(),
            message: message.into(),
            correction: None,
        }
    }

    fn with_correction(mut self, field: CorrectableField, value: FieldValue) -> Self {
        self.correction = Some(Correction { field, value });
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] Track: {} - {}", self.kind, self.track_id, self.message)
    }
}

/// Which checks run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Every check, downloading file content
    Full,
    /// Metadata-only checks, no downloads
    Fast,
}

impl VerifyMode {
    fn needs_content(&self) -> bool {
        matches!(self, VerifyMode::Full)
    }
}

/// Result of verifying one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Record has `failed` status and was not checked
    Skipped,
    /// Record was checked; empty means consistent
    Checked(Vec<Finding>),
}

/// Verifies records against one media listing
pub struct Verifier<'a> {
    media: &'a dyn MediaStore,
    index: &'a FileIndex,
    probe: Option<&'a dyn DurationProbe>,
    work_dir: &'a Path,
    tolerance_secs: i64,
    mode: VerifyMode,
    warned_no_probe: bool,
}

impl<'a> Verifier<'a> {
    pub fn new(
        media: &'a dyn MediaStore,
        index: &'a FileIndex,
        probe: Option<&'a dyn DurationProbe>,
        work_dir: &'a Path,
        tolerance_secs: i64,
        mode: VerifyMode,
    ) -> Self {
        Self {
            media,
            index,
            probe,
            work_dir,
            tolerance_secs,
            mode,
            warned_no_probe: false,
        }
    }

    /// Verify one record
    pub async fn verify(&mut self, record: &TrackMetadataRecord) -> RecordOutcome {
        if record.is_failed() {
            tracing::debug!(track_id = %record.id, "Skipping failed track");
            return RecordOutcome::Skipped;
        }

        let Some(filename) = record.filename() else {
            return RecordOutcome::Checked(vec![Finding::new(
                FindingKind::MetadataIncomplete,
                &record.id,
                "Missing filename",
            )]);
        };

        let Some(object) = self.index.locate(&record.id, filename) else {
            return RecordOutcome::Checked(vec![Finding::new(
                FindingKind::MissingFile,
                &record.id,
                format!("File not found in media store: {}", filename),
            )]);
        };

        let mut findings = Vec::new();

        if let Some(finding) = check_title(record, filename) {
            findings.push(finding);
        }

        if self.mode.needs_content() {
            findings.extend(self.check_content(record, object).await);
        }

        if let Some(finding) = check_genre(record) {
            findings.push(finding);
        }

        RecordOutcome::Checked(findings)
    }

    /// Duration and hash checks over one download of the file
    async fn check_content(&mut self, record: &TrackMetadataRecord, object: &StoredObject) -> Vec<Finding> {
        if self.probe.is_none() && !self.warned_no_probe {
            tracing::warn!("No duration probe available, skipping duration checks");
            self.warned_no_probe = true;
        }

        let stored_hash = record.file_hash();
        if self.probe.is_none() && stored_hash.is_none() {
            return Vec::new();
        }

        let local = self.local_path(record, object);
        if let Err(e) = self.media.download(&object.key, &local).await {
            tracing::warn!(track_id = %record.id, key = %object.key, "Could not download file: {}", e);
            remove_quietly(&local);
            return Vec::new();
        }

        let mut findings = Vec::new();

        if let Some(probe) = self.probe {
            match probe.measure(&local) {
                Ok(measured) => {
                    let measured = measured as i64;
                    let stored = record.duration.unwrap_or(0);
                    if (stored - measured).abs() > self.tolerance_secs {
                        findings.push(
                            Finding::new(
                                FindingKind::DurationMismatch,
                                &record.id,
                                format!("Duration mismatch: stored {}s, actual {}s", stored, measured),
                            )
                            .with_correction(CorrectableField::Duration, FieldValue::Number(measured)),
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(track_id = %record.id, "Could not measure duration: {}", e);
                }
            }
        }

        if let Some(stored) = stored_hash {
            match calculate_hash(&local).await {
                Ok(actual) if !actual.eq_ignore_ascii_case(stored) => {
                    findings.push(
                        Finding::new(
                            FindingKind::HashMismatch,
                            &record.id,
                            format!("Hash mismatch: stored {}, actual {}", stored, actual),
                        )
                        .with_correction(CorrectableField::FileHash, FieldValue::Text(actual)),
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(track_id = %record.id, "Could not hash file: {}", e);
                }
            }
        }

        remove_quietly(&local);
        findings
    }

    fn local_path(&self, record: &TrackMetadataRecord, object: &StoredObject) -> PathBuf {
        let safe_id: String = record
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.work_dir.join(format!("{}-{}", safe_id, object.basename()))
    }
}

fn check_title(record: &TrackMetadataRecord, filename: &str) -> Option<Finding> {
    let expected = expected_title(filename);
    if record.title.as_deref() == Some(expected.as_str()) {
        return None;
    }

    let stored = record.title.as_deref().unwrap_or("<none>");
    Some(
        Finding::new(
            FindingKind::TitleMismatch,
            &record.id,
            format!("Title mismatch: stored '{}', expected '{}'", stored, expected),
        )
        .with_correction(CorrectableField::Title, FieldValue::Text(expected)),
    )
}

fn check_genre(record: &TrackMetadataRecord) -> Option<Finding> {
    match record.genre() {
        None => Some(Finding::new(
            FindingKind::MetadataIncomplete,
            &record.id,
            "Missing genre",
        )),
        Some(genre) if genre.eq_ignore_ascii_case(PLACEHOLDER_GENRE) => Some(Finding::new(
            FindingKind::MetadataIncomplete,
            &record.id,
            format!("Genre not set ('{}')", genre),
        )),
        Some(_) => None,
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), "Could not remove download: {}", e);
        }
    }
}
