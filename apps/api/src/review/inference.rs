//! AI inference capability: document reference + instructions → raw completion.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::LlmClient;
use crate::review::parser::{RawModelOutput, TextSegment};
use crate::review::prompts::review_system_prompt;
use crate::storage::{ArtifactRef, BlobStore};

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Could not load document {artifact}: {reason}")]
    Document { artifact: String, reason: String },

    #[error("Model call failed: {0}")]
    Model(String),
}

/// Carried in `Collaborators` as `Arc<dyn FeedbackModel>`.
#[async_trait]
pub trait FeedbackModel: Send + Sync {
    async fn feedback(
        &self,
        document: &ArtifactRef,
        instructions: &str,
    ) -> Result<RawModelOutput, InferenceError>;
}

/// Claude-backed reviewer. Reads the uploaded PDF through the blob store and
/// sends its extracted text alongside the instructions.
pub struct ClaudeFeedbackModel {
    llm: LlmClient,
    blobs: Arc<dyn BlobStore>,
}

impl ClaudeFeedbackModel {
    pub fn new(llm: LlmClient, blobs: Arc<dyn BlobStore>) -> Self {
        Self { llm, blobs }
    }
}

#[async_trait]
impl FeedbackModel for ClaudeFeedbackModel {
    async fn feedback(
        &self,
        document: &ArtifactRef,
        instructions: &str,
    ) -> Result<RawModelOutput, InferenceError> {
        let bytes = self
            .blobs
            .read(document)
            .await
            .map_err(|e| InferenceError::Document {
                artifact: document.to_string(),
                reason: e.to_string(),
            })?;

        let resume_text = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r)
        .map_err(|reason| InferenceError::Document {
            artifact: document.to_string(),
            reason,
        })?;

        debug!(
            artifact = %document,
            chars = resume_text.len(),
            "Extracted résumé text for review"
        );

        let prompt = build_review_message(instructions, &resume_text);
        let response = self
            .llm
            .call(&prompt, &review_system_prompt())
            .await
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        Ok(RawModelOutput::Segmented(
            response
                .text_blocks()
                .into_iter()
                .map(|text| TextSegment { text })
                .collect(),
        ))
    }
}

fn build_review_message(instructions: &str, resume_text: &str) -> String {
    format!("{instructions}\n\nRÉSUMÉ TEXT:\n{}", resume_text.trim())
}
