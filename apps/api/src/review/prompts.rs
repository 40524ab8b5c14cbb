// All LLM prompt constants for résumé review.
// Reuses the JSON-only fragment from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// System prompt persona for résumé review. Sent together with `JSON_ONLY_SYSTEM`.
pub const REVIEW_SYSTEM_PERSONA: &str = "You are an expert in Applicant Tracking Systems \
    (ATS) and résumé analysis. You rate résumés honestly and give concrete, actionable \
    advice.";

/// Shape the model must answer with. Only `ATS` is required downstream;
/// the other sections are shown to the user as-is.
pub const RESPONSE_FORMAT: &str = r#"{
  "overallScore": 0,
  "ATS": {
    "score": 0,
    "tips": [
      {"type": "good", "tip": "short headline"},
      {"type": "improve", "tip": "short headline"}
    ]
  },
  "toneAndStyle": {
    "score": 0,
    "tips": [{"type": "good", "tip": "short headline", "explanation": "detailed explanation"}]
  },
  "content": {
    "score": 0,
    "tips": [{"type": "improve", "tip": "short headline", "explanation": "detailed explanation"}]
  },
  "structure": {
    "score": 0,
    "tips": [{"type": "improve", "tip": "short headline", "explanation": "detailed explanation"}]
  },
  "skills": {
    "score": 0,
    "tips": [{"type": "good", "tip": "short headline", "explanation": "detailed explanation"}]
  }
}"#;

/// Review instruction template.
/// Replace: {job_title}, {job_description}, {response_format}
pub const REVIEW_PROMPT_TEMPLATE: &str = r#"Analyze and rate the résumé below and explain how to improve it.

Scores are integers from 0 to 100. Low scores are expected when the résumé is weak;
do not inflate them. Be thorough: point out every mistake and area for improvement.
Give 3-4 tips per section, mixing "good" and "improve" tips.

Use the target role to make the feedback specific.
JOB TITLE: {job_title}
JOB DESCRIPTION:
{job_description}

Respond with a single JSON object in exactly this format:
{response_format}"#;

pub fn review_system_prompt() -> String {
    format!("{REVIEW_SYSTEM_PERSONA} {JSON_ONLY_SYSTEM}")
}

/// Renders the instruction prompt for one submission.
/// Placeholders are substituted in a single left-to-right pass, so
/// placeholder text inside the user's input is copied verbatim.
pub fn render_review_instructions(job_title: &str, job_description: &str) -> String {
    let values = [
        ("{job_title}", job_title.trim()),
        ("{job_description}", job_description.trim()),
        ("{response_format}", RESPONSE_FORMAT),
    ];

    let mut out = String::with_capacity(REVIEW_PROMPT_TEMPLATE.len() + job_description.len());
    let mut rest = REVIEW_PROMPT_TEMPLATE;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match values.iter().find(|(name, _)| tail.starts_with(name)) {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
