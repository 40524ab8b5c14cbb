//! Feedback Parser: turns a raw model completion into a validated `FeedbackReport`.
//!
//! A parse failure is never downgraded to an empty report: the caller must be
//! able to tell "not analyzed yet" from "the model answered with garbage".

use thiserror::Error;

use crate::models::feedback::FeedbackReport;

/// Text used when the completion carries no text segment at all.
const EMPTY_OBJECT: &str = "{}";

/// A model completion, either one string or a sequence of typed text segments.
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelOutput {
    PlainText(String),
    Segmented(Vec<TextSegment>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub text: String,
}

#[derive(Debug, Error)]
#[error("Malformed feedback: {reason}")]
pub struct MalformedFeedback {
    pub reason: String,
}

impl MalformedFeedback {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RawModelOutput {
    /// The text to parse: the whole payload, or the first segment.
    pub fn primary_text(&self) -> &str {
        match self {
            RawModelOutput::PlainText(text) => text,
            RawModelOutput::Segmented(segments) => segments
                .first()
                .map(|s| s.text.as_str())
                .unwrap_or(EMPTY_OBJECT),
        }
    }
}

pub fn parse_feedback(raw: &RawModelOutput) -> Result<FeedbackReport, MalformedFeedback> {
    let text = strip_json_fences(raw.primary_text());

    let report: FeedbackReport = serde_json::from_str(text)
        .map_err(|e| MalformedFeedback::new(format!("not a valid feedback object: {e}")))?;

    let score = report.ats.score;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(MalformedFeedback::new(format!(
            "ATS score {score} is outside 0-100"
        )));
    }

    Ok(report)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
/// The language tag is matched case-insensitively.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(mut body) = text.strip_prefix("```") else {
        return text;
    };
    if body.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
        body = &body[4..];
    }
    let body = body.trim_start();
    body.strip_suffix("```").map(str::trim).unwrap_or(body)
}
