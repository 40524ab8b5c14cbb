//! Axum route handlers for the Review API.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::auth::Owner;
use crate::errors::AppError;
use crate::models::feedback::FeedbackReport;
use crate::models::resume::{RecordStatus, ResumeRecord};
use crate::review::pipeline::Submission;
use crate::review::repository::{Artifact, ResumeRecordView};
use crate::state::AppState;
use crate::storage::Blob;

const PDF_CONTENT_TYPE: &str = "application/pdf";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub status: RecordStatus,
}

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub id: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub status: RecordStatus,
    pub overall_score: Option<f64>,
    pub feedback: Option<FeedbackReport>,
    pub created_at: DateTime<Utc>,
    pub document_available: bool,
    pub preview_available: bool,
}

impl From<ResumeRecordView> for ResumeResponse {
    fn from(view: ResumeRecordView) -> Self {
        let status = view.record.status();
        let overall_score = view
            .record
            .feedback
            .as_ref()
            .and_then(FeedbackReport::overall_score);
        let ResumeRecord {
            id,
            company_name,
            job_title,
            job_description,
            feedback,
            created_at,
            ..
        } = view.record;
        Self {
            id,
            company_name,
            job_title,
            job_description,
            status,
            overall_score,
            feedback,
            created_at,
            document_available: view.document.is_available(),
            preview_available: view.preview.is_available(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes
///
/// Multipart form: `company_name`, `job_title`, `job_description`, `file` (PDF).
/// Runs the whole analysis pipeline and returns the new record id.
pub async fn handle_submit(
    State(state): State<AppState>,
    owner: Owner,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let submission = read_submission(multipart).await?;
    info!(
        owner = owner.as_str(),
        file = %submission.document.file_name,
        size = submission.document.bytes.len(),
        "Received resume submission"
    );

    let id = state.pipeline_for(&owner).run(submission).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id,
            status: RecordStatus::Complete,
        }),
    ))
}

/// GET /api/v1/resumes
pub async fn handle_list(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<ResumeResponse>>, AppError> {
    let mut resumes: Vec<ResumeResponse> = state
        .repository_for(&owner)
        .list_all()
        .await?
        .into_iter()
        .map(ResumeResponse::from)
        .collect();
    resumes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(resumes))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<ResumeResponse>, AppError> {
    let view = state.repository_for(&owner).fetch(&id).await?;
    Ok(Json(ResumeResponse::from(view)))
}

/// GET /api/v1/resumes/:id/document
pub async fn handle_document(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let repo = state.repository_for(&owner);
    let record = repo.load_record(&id).await?;
    let artifact = repo.read_artifact(&record.id, &record.resume_artifact).await;
    artifact_response(&id, "document", artifact, PDF_CONTENT_TYPE)
}

/// GET /api/v1/resumes/:id/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let repo = state.repository_for(&owner);
    let record = repo.load_record(&id).await?;
    let artifact = repo.read_artifact(&record.id, &record.image_artifact).await;
    artifact_response(&id, "preview", artifact, crate::raster::PREVIEW_CONTENT_TYPE)
}

/// POST /api/v1/resumes/:id/analyze
///
/// Re-runs analysis for a record left pending by an earlier failure.
pub async fn handle_reanalyze(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<SubmitResponse>, AppError> {
    let record = state.repository_for(&owner).load_record(&id).await?;
    let id = state.pipeline_for(&owner).complete_pending(record).await?;
    Ok(Json(SubmitResponse {
        id,
        status: RecordStatus::Complete,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn artifact_response(
    id: &str,
    what: &str,
    artifact: Artifact,
    content_type: &'static str,
) -> Result<Response, AppError> {
    match artifact {
        Artifact::Available(bytes) => {
            Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
        }
        Artifact::Missing => Err(AppError::NotFound(format!(
            "The {what} for resume {id} is not available"
        ))),
        Artifact::Unreadable(reason) => Err(AppError::Storage(reason)),
    }
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, AppError> {
    let mut company_name = String::new();
    let mut job_title = String::new();
    let mut job_description = String::new();
    let mut document: Option<Blob> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "company_name" => company_name = field_text(field).await?,
            "job_title" => job_title = field_text(field).await?,
            "job_description" => job_description = field_text(field).await?,
            "file" => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read file: {e}")))?;
                document = Some(validate_document(file_name, &content_type, bytes)?);
            }
            _ => {}
        }
    }

    let document =
        document.ok_or_else(|| AppError::Validation("A resume file is required".to_string()))?;

    Ok(Submission {
        company_name,
        job_title,
        job_description,
        document,
    })
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map(|t| t.trim().to_string())
        .map_err(|e| AppError::Validation(format!("Invalid form field: {e}")))
}

fn validate_document(
    file_name: String,
    content_type: &str,
    bytes: Bytes,
) -> Result<Blob, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("The uploaded file is empty".to_string()));
    }
    let is_pdf = content_type == PDF_CONTENT_TYPE
        || file_name.to_ascii_lowercase().ends_with(".pdf")
        || bytes.starts_with(b"%PDF-");
    if !is_pdf {
        return Err(AppError::Validation("Only PDF files are supported".to_string()));
    }
    Ok(Blob {
        file_name,
        content_type: PDF_CONTENT_TYPE.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_document_accepts_pdf_by_extension() {
        let blob = validate_document(
            "CV.PDF".to_string(),
            "application/octet-stream",
            Bytes::from_static(b"data"),
        )
        .unwrap();
        assert_eq!(blob.content_type, PDF_CONTENT_TYPE);
    }

    #[test]
    fn test_validate_document_accepts_pdf_by_magic() {
        assert!(validate_document("upload".to_string(), "", Bytes::from_static(b"%PDF-1.4")).is_ok());
    }

    #[test]
    fn test_validate_document_rejects_other_types() {
        let err = validate_document(
            "photo.jpg".to_string(),
            "image/jpeg",
            Bytes::from_static(b"\xff\xd8\xff"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_validate_document_rejects_empty_file() {
        assert!(validate_document("cv.pdf".to_string(), PDF_CONTENT_TYPE, Bytes::new()).is_err());
    }
}
