//! Record Repository: read path for persisted records and their artifacts.
//!
//! Artifact resolution is best-effort: a missing or unreadable blob is
//! reported on the view, it never fails the fetch.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

use crate::models::resume::{record_key, ResumeRecord, RECORD_KEY_PREFIX};
use crate::storage::{ArtifactRef, BlobStore, KvStore, StorageError};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Resume {0} not found")]
    NotFound(String),

    #[error("Failed to read resume data: {0}")]
    ReadError(String),

    #[error("Stored resume {id} is malformed: {reason}")]
    MalformedRecord { id: String, reason: String },
}

/// Resolution outcome for one artifact reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Available(Bytes),
    Missing,
    Unreadable(String),
}

impl Artifact {
    pub fn is_available(&self) -> bool {
        matches!(self, Artifact::Available(_))
    }
}

#[derive(Debug, Clone)]
pub struct ResumeRecordView {
    pub record: ResumeRecord,
    pub document: Artifact,
    pub preview: Artifact,
}

pub struct RecordRepository {
    blobs: Arc<dyn BlobStore>,
    kv: Arc<dyn KvStore>,
}

impl RecordRepository {
    pub fn new(blobs: Arc<dyn BlobStore>, kv: Arc<dyn KvStore>) -> Self {
        Self { blobs, kv }
    }

    /// Loads and deserializes `resume:<id>` without touching blob storage.
    pub async fn load_record(&self, id: &str) -> Result<ResumeRecord, RepositoryError> {
        let value = self
            .kv
            .get(&record_key(id))
            .await
            .map_err(|e| RepositoryError::ReadError(e.to_string()))?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        serde_json::from_str(&value).map_err(|e| RepositoryError::MalformedRecord {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn fetch(&self, id: &str) -> Result<ResumeRecordView, RepositoryError> {
        let record = self.load_record(id).await?;
        Ok(self.resolve(record).await)
    }

    /// Every record in the store, in store-defined order. Entries that fail to
    /// deserialize are logged and skipped.
    pub async fn list_all(&self) -> Result<Vec<ResumeRecordView>, RepositoryError> {
        let entries = self
            .kv
            .list(RECORD_KEY_PREFIX, true)
            .await
            .map_err(|e| RepositoryError::ReadError(e.to_string()))?;

        let mut views = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(value) = entry.value else {
                continue;
            };
            match serde_json::from_str::<ResumeRecord>(&value) {
                Ok(record) => views.push(self.resolve(record).await),
                Err(e) => warn!(key = %entry.key, "Skipping malformed resume record: {e}"),
            }
        }
        Ok(views)
    }

    async fn resolve(&self, record: ResumeRecord) -> ResumeRecordView {
        let document = self.read_artifact(&record.id, &record.resume_artifact).await;
        let preview = self.read_artifact(&record.id, &record.image_artifact).await;
        ResumeRecordView {
            record,
            document,
            preview,
        }
    }

    pub async fn read_artifact(&self, record_id: &str, artifact: &ArtifactRef) -> Artifact {
        match self.blobs.read(artifact).await {
            Ok(bytes) => Artifact::Available(bytes),
            Err(StorageError::NotFound(_)) => {
                warn!(record_id, artifact = %artifact, "Artifact missing");
                Artifact::Missing
            }
            Err(e) => {
                warn!(record_id, artifact = %artifact, "Artifact unreadable: {e}");
                Artifact::Unreadable(e.to_string())
            }
        }
    }
}
