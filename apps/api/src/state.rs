use std::sync::Arc;

use crate::auth::Owner;
use crate::config::Config;
use crate::raster::Rasterizer;
use crate::review::inference::FeedbackModel;
use crate::review::pipeline::{AnalysisPipeline, Collaborators};
use crate::review::repository::RecordRepository;
use crate::storage::{BlobStore, KvStore, ScopedKv};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub blobs: Arc<dyn BlobStore>,
    /// Unscoped store. Handlers only reach it through `collaborators_for`.
    pub kv: Arc<dyn KvStore>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub model: Arc<dyn FeedbackModel>,
    pub config: Config,
}

impl AppState {
    /// Collaborator bundle whose key-value view is confined to `owner`.
    pub fn collaborators_for(&self, owner: &Owner) -> Collaborators {
        let scope = format!("{}:{}", self.config.kv_namespace, owner.as_str());
        Collaborators {
            blobs: self.blobs.clone(),
            kv: Arc::new(ScopedKv::new(self.kv.clone(), scope)),
            rasterizer: self.rasterizer.clone(),
            model: self.model.clone(),
        }
    }

    pub fn pipeline_for(&self, owner: &Owner) -> AnalysisPipeline {
        AnalysisPipeline::new(self.collaborators_for(owner))
    }

    pub fn repository_for(&self, owner: &Owner) -> RecordRepository {
        let collaborators = self.collaborators_for(owner);
        RecordRepository::new(collaborators.blobs, collaborators.kv)
    }
}
