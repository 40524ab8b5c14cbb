use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::feedback::FeedbackReport;
use crate::storage::ArtifactRef;

/// Key-value prefix shared by every persisted record.
pub const RECORD_KEY_PREFIX: &str = "resume:";

pub fn record_key(id: &str) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

/// One submission. Stored as JSON under `resume:<id>`, first as a draft
/// (`feedback: null`) and then overwritten once with the parsed feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: String,
    #[serde(rename = "resumePath")]
    pub resume_artifact: ArtifactRef,
    #[serde(rename = "imagePath")]
    pub image_artifact: ArtifactRef,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub feedback: Option<FeedbackReport>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Complete,
}

impl ResumeRecord {
    pub fn key(&self) -> String {
        record_key(&self.id)
    }

    pub fn status(&self) -> RecordStatus {
        if self.feedback.is_some() {
            RecordStatus::Complete
        } else {
            RecordStatus::Pending
        }
    }
}
