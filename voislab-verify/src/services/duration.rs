//! Audio duration measurement
//!
//! Reads the container properties with lofty; no decoding is needed to
//! learn the playing time. Durations are truncated to whole seconds, the
//! precision stored in the metadata table.

use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;
use thiserror::Error;

/// Duration measurement errors
#[derive(Debug, Error)]
pub enum DurationError {
    /// File could not be parsed as audio
    #[error("Failed to read audio properties: {0}")]
    ReadError(String),

    /// I/O error (file read)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Measures the playing time of an audio file
pub trait DurationProbe: Send + Sync {
    /// Duration in whole seconds
    fn measure(&self, file_path: &Path) -> Result<u64, DurationError>;
}

/// Duration probe backed by lofty
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyDurationProbe;

impl LoftyDurationProbe {
    pub fn new() -> Self {
        Self
    }
}

impl DurationProbe for LoftyDurationProbe {
    fn measure(&self, file_path: &Path) -> Result<u64, DurationError> {
        // Object keys carry the extension, but guess from content in case
        // the upload was misnamed
        let tagged_file = Probe::open(file_path)
            .map_err(|e| DurationError::ReadError(e.to_string()))?
            .guess_file_type()?
            .read()
            .map_err(|e| DurationError::ReadError(e.to_string()))?;

        let seconds = tagged_file.properties().duration().as_secs();

        tracing::debug!(file = %file_path.display(), seconds, "Measured duration");
        Ok(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, seconds: u32, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..(seconds * sample_rate) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_measure_wav_duration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 3, 8000);

        let seconds = LoftyDurationProbe::new().measure(&path).unwrap();
        assert_eq!(seconds, 3);
    }

    #[test]
    fn test_non_audio_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();

        assert!(LoftyDurationProbe::new().measure(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = LoftyDurationProbe::new().measure(Path::new("/nonexistent/file.mp3"));
        assert!(result.is_err());
    }
}
