//! Analysis Orchestrator: drives one submission from upload to final record.
//!
//! Flow: upload document → rasterize page 1 → upload preview →
//!       persist draft (`feedback: null`) → invoke model → parse → persist final.
//!
//! Steps run strictly in order and none is retried. The first failure ends the
//! run; whatever was persisted before it stays as the observable state. The
//! draft write is the durability checkpoint: once it succeeds the failure
//! carries the record id so the caller can re-run analysis later.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::ids::new_id;
use crate::models::resume::ResumeRecord;
use crate::raster::{self, preview_file_name, Rasterizer, PREVIEW_CONTENT_TYPE};
use crate::review::inference::FeedbackModel;
use crate::review::parser::parse_feedback;
use crate::review::prompts::render_review_instructions;
use crate::storage::{Blob, BlobStore, KvStore};

// ────────────────────────────────────────────────────────────────────────────
// Collaborators and inputs
// ────────────────────────────────────────────────────────────────────────────

/// Everything the pipeline talks to, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub blobs: Arc<dyn BlobStore>,
    pub kv: Arc<dyn KvStore>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub model: Arc<dyn FeedbackModel>,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub document: Blob,
}

// ────────────────────────────────────────────────────────────────────────────
// Stages and failures
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uploading,
    Rasterizing,
    UploadingPreview,
    PersistingDraft,
    InvokingModel,
    Parsing,
    PersistingFinal,
    Complete,
}

impl Stage {
    /// Human-readable progress label. Observability only.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Uploading => "Uploading the file...",
            Stage::Rasterizing => "Converting to image...",
            Stage::UploadingPreview => "Uploading the image...",
            Stage::PersistingDraft => "Preparing data...",
            Stage::InvokingModel => "Analyzing...",
            Stage::Parsing => "Reading feedback...",
            Stage::PersistingFinal => "Saving feedback...",
            Stage::Complete => "Analysis complete",
        }
    }

    fn announce(self, record_id: Option<&str>) {
        info!(stage = ?self, record_id = record_id.unwrap_or("-"), "{}", self.label());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    UploadFailed,
    ConversionFailed,
    PersistFailed,
    InferenceFailed,
    MalformedFeedback,
}

impl FailureKind {
    /// Reason string shown to the submitter.
    pub fn reason(self) -> &'static str {
        match self {
            FailureKind::UploadFailed => "Error: failed to upload file",
            FailureKind::ConversionFailed => "Error: failed to convert PDF to image",
            FailureKind::PersistFailed => "Error: failed to save resume data",
            FailureKind::InferenceFailed => "Error: failed to analyze resume",
            FailureKind::MalformedFeedback => "Error: invalid feedback format",
        }
    }
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
#[error("{}: {detail}", .kind.reason())]
pub struct AnalysisFailure {
    pub kind: FailureKind,
    /// Id of the draft record left behind, when one was persisted.
    pub draft_id: Option<String>,
    pub detail: String,
}

impl AnalysisFailure {
    fn before_draft(kind: FailureKind, detail: impl ToString) -> Self {
        Self {
            kind,
            draft_id: None,
            detail: detail.to_string(),
        }
    }

    fn after_draft(kind: FailureKind, id: &str, detail: impl ToString) -> Self {
        Self {
            kind,
            draft_id: Some(id.to_string()),
            detail: detail.to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct AnalysisPipeline {
    collaborators: Collaborators,
}

impl AnalysisPipeline {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Runs every stage for a new submission and returns the record id.
    pub async fn run(&self, submission: Submission) -> Result<String, AnalysisFailure> {
        let Collaborators {
            blobs, rasterizer, ..
        } = &self.collaborators;

        Stage::Uploading.announce(None);
        let resume_artifact = blobs
            .upload(&submission.document)
            .await
            .map_err(|e| AnalysisFailure::before_draft(FailureKind::UploadFailed, e))?;

        Stage::Rasterizing.announce(None);
        let preview = raster::rasterize_first_page(
            rasterizer.clone(),
            submission.document.bytes.clone(),
        )
        .await
        .map_err(|e| AnalysisFailure::before_draft(FailureKind::ConversionFailed, e))?;

        Stage::UploadingPreview.announce(None);
        let image_artifact = blobs
            .upload(&Blob {
                file_name: preview_file_name(&submission.document.file_name),
                content_type: PREVIEW_CONTENT_TYPE.to_string(),
                bytes: preview,
            })
            .await
            .map_err(|e| AnalysisFailure::before_draft(FailureKind::UploadFailed, e))?;

        let record = ResumeRecord {
            id: new_id(),
            resume_artifact,
            image_artifact,
            company_name: submission.company_name,
            job_title: submission.job_title,
            job_description: submission.job_description,
            feedback: None,
            created_at: Utc::now(),
        };

        Stage::PersistingDraft.announce(Some(&record.id));
        self.persist(&record)
            .await
            .map_err(|e| AnalysisFailure::before_draft(FailureKind::PersistFailed, e))?;

        self.analyze(record).await
    }

    /// Re-runs model invocation, parsing and the final write for a persisted
    /// record. A record that already has feedback is left untouched.
    pub async fn complete_pending(&self, record: ResumeRecord) -> Result<String, AnalysisFailure> {
        if record.feedback.is_some() {
            info!(record_id = %record.id, "Record already complete, skipping analysis");
            return Ok(record.id);
        }
        self.analyze(record).await
    }

    async fn analyze(&self, mut record: ResumeRecord) -> Result<String, AnalysisFailure> {
        Stage::InvokingModel.announce(Some(&record.id));
        let instructions = render_review_instructions(&record.job_title, &record.job_description);
        let raw = self
            .collaborators
            .model
            .feedback(&record.resume_artifact, &instructions)
            .await
            .map_err(|e| {
                warn!(record_id = %record.id, "Model invocation failed: {e}");
                AnalysisFailure::after_draft(FailureKind::InferenceFailed, &record.id, e)
            })?;

        Stage::Parsing.announce(Some(&record.id));
        let feedback = parse_feedback(&raw).map_err(|e| {
            warn!(record_id = %record.id, "Model returned unusable feedback: {e}");
            AnalysisFailure::after_draft(FailureKind::MalformedFeedback, &record.id, e)
        })?;

        record.feedback = Some(feedback);

        Stage::PersistingFinal.announce(Some(&record.id));
        self.persist(&record).await.map_err(|e| {
            AnalysisFailure::after_draft(FailureKind::PersistFailed, &record.id, e)
        })?;

        Stage::Complete.announce(Some(&record.id));
        Ok(record.id)
    }

    async fn persist(&self, record: &ResumeRecord) -> Result<(), String> {
        let value = serde_json::to_string(record).map_err(|e| e.to_string())?;
        self.collaborators
            .kv
            .set(&record.key(), &value)
            .await
            .map_err(|e| e.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::models::resume::record_key;
    use crate::raster::ConversionError;
    use crate::review::inference::InferenceError;
    use crate::review::parser::{RawModelOutput, TextSegment};
    use crate::storage::memory::{MemoryBlobStore, MemoryKvStore};
    use crate::storage::ArtifactRef;

    const GOOD_FEEDBACK: &str = r#"{"overallScore": 71, "ATS": {"score": 78, "tips": [{"type": "good", "tip": "Standard headings"}, {"type": "improve", "tip": "Mention Rust"}]}, "skills": {"score": 60, "tips": []}}"#;

    struct FakeRasterizer {
        fail: bool,
    }

    impl Rasterizer for FakeRasterizer {
        fn rasterize_first_page(&self, _document: &[u8]) -> Result<Vec<u8>, ConversionError> {
            if self.fail {
                Err(ConversionError::InvalidDocument("not a PDF".to_string()))
            } else {
                Ok(b"\x89PNG fake".to_vec())
            }
        }
    }

    enum Reply {
        Text(&'static str),
        Fail,
    }

    struct FakeModel {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeModel {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FeedbackModel for FakeModel {
        async fn feedback(
            &self,
            _document: &ArtifactRef,
            instructions: &str,
        ) -> Result<RawModelOutput, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(instructions.contains("JOB TITLE: Engineer"));
            match self.reply {
                Reply::Text(text) => Ok(RawModelOutput::Segmented(vec![TextSegment {
                    text: text.to_string(),
                }])),
                Reply::Fail => Err(InferenceError::Model("connection reset".to_string())),
            }
        }
    }

    struct Harness {
        blobs: Arc<MemoryBlobStore>,
        kv: Arc<MemoryKvStore>,
        model: Arc<FakeModel>,
        pipeline: AnalysisPipeline,
    }

    fn harness(raster_fails: bool, reply: Reply) -> Harness {
        let blobs = Arc::new(MemoryBlobStore::default());
        let kv = Arc::new(MemoryKvStore::default());
        let model = Arc::new(FakeModel::new(reply));
        let pipeline = AnalysisPipeline::new(Collaborators {
            blobs: blobs.clone(),
            kv: kv.clone(),
            rasterizer: Arc::new(FakeRasterizer { fail: raster_fails }),
            model: model.clone(),
        });
        Harness {
            blobs,
            kv,
            model,
            pipeline,
        }
    }

    fn submission() -> Submission {
        Submission {
            company_name: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            job_description: "Build things".to_string(),
            document: Blob {
                file_name: "resume.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: Bytes::from_static(b"%PDF-1.7 fake"),
            },
        }
    }

    async fn stored(kv: &MemoryKvStore, id: &str) -> Option<ResumeRecord> {
        kv.get(&record_key(id))
            .await
            .unwrap()
            .map(|v| serde_json::from_str(&v).unwrap())
    }

    #[tokio::test]
    async fn test_successful_run_persists_final_record() {
        let h = harness(false, Reply::Text(GOOD_FEEDBACK));

        let id = h.pipeline.run(submission()).await.unwrap();

        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        let record = stored(&h.kv, &id).await.expect("record persisted");
        assert_eq!(record.id, id);
        assert_eq!(record.company_name, "Acme");
        let feedback = record.feedback.expect("feedback present");
        assert!((0.0..=100.0).contains(&feedback.ats.score));
        assert_eq!(feedback.ats.tips.len(), 2);
        assert!(feedback.sections.contains_key("skills"));

        assert_eq!(h.kv.list("resume:", false).await.unwrap().len(), 1);
        assert_eq!(h.blobs.len(), 2);
        assert_eq!(
            h.blobs.read(&record.image_artifact).await.unwrap(),
            Bytes::from_static(b"\x89PNG fake")
        );
        assert!(record.image_artifact.as_str().ends_with("/resume.png"));
    }

    #[tokio::test]
    async fn test_upload_failure_persists_nothing() {
        let h = harness(false, Reply::Text(GOOD_FEEDBACK));
        h.blobs.fail_uploads_named("resume.pdf");

        let err = h.pipeline.run(submission()).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::UploadFailed);
        assert!(err.draft_id.is_none());
        assert!(h.kv.list("resume:", false).await.unwrap().is_empty());
        assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_conversion_failure_writes_no_draft() {
        let h = harness(true, Reply::Text(GOOD_FEEDBACK));

        let err = h.pipeline.run(submission()).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::ConversionFailed);
        assert!(err.draft_id.is_none());
        // Only the original document was uploaded; the preview upload never ran.
        assert_eq!(h.blobs.len(), 1);
        assert!(h.kv.list("resume:", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preview_upload_failure_writes_no_draft() {
        let h = harness(false, Reply::Text(GOOD_FEEDBACK));
        h.blobs.fail_uploads_named("resume.png");

        let err = h.pipeline.run(submission()).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::UploadFailed);
        assert!(h.kv.list("resume:", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_draft_write_failure_is_reported_before_model_call() {
        let h = harness(false, Reply::Text(GOOD_FEEDBACK));
        h.kv.fail_writes();

        let err = h.pipeline.run(submission()).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::PersistFailed);
        assert!(err.draft_id.is_none());
        assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_failure_leaves_draft_without_feedback() {
        let h = harness(false, Reply::Fail);

        let err = h.pipeline.run(submission()).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::InferenceFailed);
        let id = err.draft_id.expect("draft id reported");
        let record = stored(&h.kv, &id).await.expect("draft persisted");
        assert!(record.feedback.is_none());
    }

    #[tokio::test]
    async fn test_non_json_reply_keeps_draft_state() {
        let h = harness(false, Reply::Text("I am unable to review this document."));

        let err = h.pipeline.run(submission()).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::MalformedFeedback);
        let id = err.draft_id.expect("draft id reported");
        let record = stored(&h.kv, &id).await.expect("draft persisted");
        assert!(record.feedback.is_none());
        assert_eq!(h.kv.list("resume:", false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_object_reply_is_not_a_success() {
        let h = harness(false, Reply::Text("{}"));

        let err = h.pipeline.run(submission()).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::MalformedFeedback);
    }

    #[tokio::test]
    async fn test_complete_pending_upgrades_draft() {
        let failing = harness(false, Reply::Fail);
        let err = failing.pipeline.run(submission()).await.unwrap_err();
        let id = err.draft_id.unwrap();
        let draft = stored(&failing.kv, &id).await.unwrap();

        let retry = AnalysisPipeline::new(Collaborators {
            blobs: failing.blobs.clone(),
            kv: failing.kv.clone(),
            rasterizer: Arc::new(FakeRasterizer { fail: false }),
            model: Arc::new(FakeModel::new(Reply::Text(GOOD_FEEDBACK))),
        });
        let completed = retry.complete_pending(draft.clone()).await.unwrap();

        assert_eq!(completed, id);
        let record = stored(&failing.kv, &id).await.unwrap();
        assert!(record.feedback.is_some());
        assert_eq!(record.resume_artifact, draft.resume_artifact);
        assert_eq!(record.created_at, draft.created_at);
    }

    #[tokio::test]
    async fn test_complete_pending_skips_complete_record() {
        let h = harness(false, Reply::Text(GOOD_FEEDBACK));
        let id = h.pipeline.run(submission()).await.unwrap();
        let record = stored(&h.kv, &id).await.unwrap();

        let again = h.pipeline.complete_pending(record).await.unwrap();

        assert_eq!(again, id);
        assert_eq!(h.model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_message_leads_with_reason() {
        let failure =
            AnalysisFailure::before_draft(FailureKind::ConversionFailed, "Document has no pages");
        assert_eq!(
            failure.to_string(),
            "Error: failed to convert PDF to image: Document has no pages"
        );
    }
}
