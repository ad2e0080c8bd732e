//! Test Helper Utilities
//!
//! Record and media fixtures, a fixed-duration probe and a scripted
//! confirmation prompt for pipeline tests.

use std::path::{Path, PathBuf};
use voislab_common::config::{Environment, VerifyConfig};
use voislab_common::TrackMetadataRecord;
use voislab_verify::report::Confirm;
use voislab_verify::services::{DurationError, DurationProbe};
use voislab_verify::VerifyResult;

/// SHA-256 of the bytes `abc`
pub const SHA_ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

/// Config pointing artifacts at `output_dir`
pub fn test_config(output_dir: &Path) -> VerifyConfig {
    VerifyConfig {
        environment: Environment::Dev,
        region: None,
        metadata_table: "voislab-audio-metadata-dev".to_string(),
        media_bucket: Some("voislab-media-dev-000000000000".to_string()),
        media_prefix: "audio/".to_string(),
        output_dir: output_dir.to_path_buf(),
        duration_tolerance_secs: 2,
    }
}

/// A processed record consistent with a file named `filename` holding `abc`
pub fn consistent_record(id: &str, filename: &str, title: &str) -> TrackMetadataRecord {
    let mut record = TrackMetadataRecord::new(id, "2025-06-01T12:00:00");
    record.filename = Some(filename.to_string());
    record.title = Some(title.to_string());
    record.duration = Some(180);
    record.genre = Some("electronic".to_string());
    record.file_hash = Some(SHA_ABC.to_string());
    record.status = Some("processed".into());
    record
}

pub fn failed_record(id: &str) -> TrackMetadataRecord {
    let mut record = TrackMetadataRecord::new(id, "2025-06-01T12:00:00");
    record.filename = Some("broken.wav".to_string());
    record.status = Some("failed".into());
    record.error_message = Some("Unsupported file format".to_string());
    record
}

/// Canonical media key for a track
pub fn media_key(id: &str, filename: &str) -> String {
    format!("audio/{}/{}", id, filename)
}

/// Probe that reports the same duration for every file
pub struct FixedProbe(pub u64);

impl DurationProbe for FixedProbe {
    fn measure(&self, _file_path: &Path) -> Result<u64, DurationError> {
        Ok(self.0)
    }
}

/// Confirmation that answers from a fixed script
pub struct ScriptedConfirm {
    answer: bool,
    pub prompts: Vec<String>,
}

impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Vec::new(),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, prompt: &str) -> VerifyResult<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self.answer)
    }
}

/// Files in `dir` whose name starts with `prefix`
pub fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with(prefix))
                        .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}
