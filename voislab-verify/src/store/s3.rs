//! S3-backed media store

use super::{MediaStore, StoredObject};
use crate::error::{VerifyError, VerifyResult};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Media bucket in S3
pub struct S3MediaStore {
    client: Client,
    bucket: String,
}

impl S3MediaStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn list_objects(&self, prefix: &str) -> VerifyResult<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    VerifyError::MediaStore(format!(
                        "Failed to list s3://{}/{}: {}",
                        self.bucket,
                        prefix,
                        DisplayErrorContext(&e)
                    ))
                })?;

            for object in page.contents() {
                if let Some(key) = object.key() {
                    let size = object.size().unwrap_or(0).max(0) as u64;
                    objects.push(StoredObject::new(key, size));
                }
            }

            match (page.is_truncated(), page.next_continuation_token()) {
                (Some(true), Some(token)) => continuation = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!(bucket = %self.bucket, prefix, objects = objects.len(), "Listed media objects");
        Ok(objects)
    }

    async fn download(&self, key: &str, dest: &Path) -> VerifyResult<u64> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                VerifyError::MediaStore(format!(
                    "Failed to download s3://{}/{}: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        let mut body = output.body;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;

        while let Some(chunk) = body.try_next().await.map_err(|e| {
            VerifyError::MediaStore(format!("Failed to read s3://{}/{}: {}", self.bucket, key, e))
        })? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(key, bytes = written, dest = %dest.display(), "Downloaded object");
        Ok(written)
    }
}
