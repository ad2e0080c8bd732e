//! File content hashing
//!
//! Calculates the SHA-256 digest the upload pipeline stores in `fileHash`.

use crate::error::{VerifyError, VerifyResult};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Calculate SHA-256 hash of file
///
/// **Algorithm:**
/// 1. Read file content in chunks (1MB at a time for memory efficiency)
/// 2. Calculate SHA-256 hash
/// 3. Return lowercase hex-encoded hash string
pub async fn calculate_hash(file_path: &Path) -> VerifyResult<String> {
    let path_buf = file_path.to_path_buf();
    tracing::debug!(path = %path_buf.display(), "Calculating SHA-256 hash");

    // Hashing is CPU-bound; keep it off the runtime thread
    let hash = tokio::task::spawn_blocking(move || -> VerifyResult<String> {
        use std::fs::File;
        use std::io::Read;

        let mut file = File::open(&path_buf).map_err(|e| {
            VerifyError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open file for hashing: {}", e),
            ))
        })?;

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 1024 * 1024];

        loop {
            let bytes_read = file.read(&mut buffer).map_err(|e| {
                VerifyError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to read file for hashing: {}", e),
                ))
            })?;

            if bytes_read == 0 {
                break;
            }

            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    })
    .await
    .map_err(|e| {
        VerifyError::Io(std::io::Error::other(format!(
            "Hash calculation task failed: {}",
            e
        )))
    })??;

    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.bin");
        std::fs::write(&path, b"abc").unwrap();

        let hash = calculate_hash(&path).await.unwrap();
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_empty_file_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let hash = calculate_hash(&path).await.unwrap();
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let result = calculate_hash(Path::new("/nonexistent/file.wav")).await;
        assert!(result.is_err());
    }
}
