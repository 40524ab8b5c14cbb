//! Storage Gateway: blob upload/read and a namespaced string key-value store.
//!
//! Both halves are traits so the pipeline can run against S3 + Redis in
//! production and in-memory stores in tests. Every call is remote and fallible;
//! callers never assume success.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod redis_kv;
pub mod s3;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Key-value store error: {0}")]
    Kv(String),
}

/// Opaque handle to an uploaded blob. Serialized as a bare path string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An in-memory file about to be uploaded.
#[derive(Debug, Clone)]
pub struct Blob {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    /// `None` when the listing was requested without values.
    pub value: Option<String>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the blob under a fresh path. Retrying after a failure never
    /// touches artifacts written by earlier calls.
    async fn upload(&self, blob: &Blob) -> Result<ArtifactRef, StorageError>;

    async fn read(&self, artifact: &ArtifactRef) -> Result<Bytes, StorageError>;
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// All entries whose key starts with `prefix`, in store-defined order.
    async fn list(&self, prefix: &str, with_values: bool) -> Result<Vec<KvEntry>, StorageError>;
}

/// Builds a collision-free object path for an upload: `uploads/<uuid>/<name>`.
pub fn upload_path(file_name: &str) -> String {
    format!(
        "uploads/{}/{}",
        crate::ids::new_id(),
        sanitize_file_name(file_name)
    )
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Key-value view confined to one owner: every key is stored as
/// `<scope>:<key>` and listings strip the scope again.
pub struct ScopedKv {
    inner: Arc<dyn KvStore>,
    scope: String,
}

impl ScopedKv {
    pub fn new(inner: Arc<dyn KvStore>, scope: impl Into<String>) -> Self {
        Self {
            inner,
            scope: scope.into(),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{key}", self.scope)
    }
}

#[async_trait]
impl KvStore for ScopedKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(&self.scoped(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(&self.scoped(key), value).await
    }

    async fn list(&self, prefix: &str, with_values: bool) -> Result<Vec<KvEntry>, StorageError> {
        let scope_prefix = self.scoped("");
        let entries = self.inner.list(&self.scoped(prefix), with_values).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let key = entry.key.strip_prefix(&scope_prefix)?.to_string();
                Some(KvEntry {
                    key,
                    value: entry.value,
                })
            })
            .collect())
    }
}
