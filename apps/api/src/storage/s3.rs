use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, warn};

use super::{upload_path, ArtifactRef, Blob, BlobStore, StorageError};
use crate::config::Config;

/// Blob storage backed by S3 (AWS in production, MinIO locally).
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Constructs a store whose client is configured for MinIO (local) or AWS (production).
    pub async fn from_config(config: &Config) -> Self {
        let credentials = Credentials::new(
            &config.aws_access_key_id,
            &config.aws_secret_access_key,
            None,
            None,
            "atsly-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(&config.s3_endpoint)
            .load()
            .await;

        // MinIO serves buckets by path, not by virtual host.
        let client_config = aws_sdk_s3::config::Builder::from(&s3_config)
            .force_path_style(true)
            .build();

        Self::new(Client::from_conf(client_config), config.s3_bucket.clone())
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, blob: &Blob) -> Result<ArtifactRef, StorageError> {
        let key = upload_path(&blob.file_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&blob.content_type)
            .body(ByteStream::from(blob.bytes.clone()))
            .send()
            .await
            .map_err(|e| {
                warn!("S3 put_object failed for {key}: {e}");
                StorageError::Upload(format!("put_object {key}: {e}"))
            })?;

        debug!(key = %key, size = blob.bytes.len(), "Uploaded artifact");
        Ok(ArtifactRef::new(key))
    }

    async fn read(&self, artifact: &ArtifactRef) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(artifact.as_str())
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    StorageError::NotFound(artifact.to_string())
                } else {
                    StorageError::Read(format!("get_object {artifact}: {e}"))
                }
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Read(format!("reading body of {artifact}: {e}")))?;

        Ok(body.into_bytes())
    }
}
