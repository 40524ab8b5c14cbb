//! In-memory Storage Gateway used by tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::{upload_path, ArtifactRef, Blob, BlobStore, KvEntry, KvStore, StorageError};

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Bytes>>,
    /// File names whose upload should fail.
    failing_names: Mutex<HashSet<String>>,
    fail_reads: Mutex<bool>,
}

impl MemoryBlobStore {
    pub fn fail_uploads_named(&self, file_name: &str) {
        self.failing_names
            .lock()
            .unwrap()
            .insert(file_name.to_string());
    }

    pub fn fail_reads(&self) {
        *self.fail_reads.lock().unwrap() = true;
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn remove(&self, artifact: &ArtifactRef) {
        self.blobs.lock().unwrap().remove(artifact.as_str());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, blob: &Blob) -> Result<ArtifactRef, StorageError> {
        if self.failing_names.lock().unwrap().contains(&blob.file_name) {
            return Err(StorageError::Upload(format!(
                "refusing to store {}",
                blob.file_name
            )));
        }
        let path = upload_path(&blob.file_name);
        self.blobs
            .lock()
            .unwrap()
            .insert(path.clone(), blob.bytes.clone());
        Ok(ArtifactRef::new(path))
    }

    async fn read(&self, artifact: &ArtifactRef) -> Result<Bytes, StorageError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StorageError::Read(format!("read of {artifact} timed out")));
        }
        self.blobs
            .lock()
            .unwrap()
            .get(artifact.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(artifact.to_string()))
    }
}

#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
    fail_writes: Mutex<bool>,
    fail_reads: Mutex<bool>,
}

impl MemoryKvStore {
    pub fn fail_reads(&self) {
        *self.fail_reads.lock().unwrap() = true;
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StorageError::Kv(format!("read of {key} rejected")));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::Kv(format!("write to {key} rejected")));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list(&self, prefix: &str, with_values: bool) -> Result<Vec<KvEntry>, StorageError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StorageError::Kv(format!("scan of {prefix}* rejected")));
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| KvEntry {
                key: k.clone(),
                value: with_values.then(|| v.clone()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reading_an_artifact_twice_is_byte_identical() {
        let store = MemoryBlobStore::default();
        let artifact = store
            .upload(&Blob {
                file_name: "cv.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: Bytes::from_static(b"%PDF-1.7 body"),
            })
            .await
            .unwrap();

        let first = store.read(&artifact).await.unwrap();
        let second = store.read(&artifact).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_list_without_values_omits_them() {
        let kv = MemoryKvStore::default();
        kv.set("resume:a", "{}").await.unwrap();
        kv.set("other:b", "{}").await.unwrap();

        let entries = kv.list("resume:", false).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "resume:a");
        assert!(entries[0].value.is_none());
    }
}
