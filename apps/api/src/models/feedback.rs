use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured feedback returned by the analysis model.
///
/// Only the ATS section is interpreted. Every other top-level key
/// (`overallScore`, `toneAndStyle`, `content`, ...) is carried through
/// untouched and in its original order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    #[serde(rename = "ATS")]
    pub ats: AtsSection,
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsSection {
    /// 0 – 100
    pub score: f64,
    pub tips: Vec<AtsTip>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One ATS tip. Objects whose `type` is not a known kind are kept verbatim
/// rather than failing the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AtsTip {
    Detailed(TipDetail),
    Plain(String),
    Unrecognized(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipDetail {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

impl FeedbackReport {
    /// `overallScore` when the model supplied a numeric one.
    pub fn overall_score(&self) -> Option<f64> {
        self.sections.get("overallScore").and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sections_pass_through() {
        let json = r#"{
            "overallScore": 72,
            "ATS": {"score": 80, "tips": [{"type": "good", "tip": "Clear headings"}]},
            "toneAndStyle": {"score": 60, "tips": []}
        }"#;
        let report: FeedbackReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.ats.score, 80.0);
        assert_eq!(report.overall_score(), Some(72.0));
        assert!(report.sections.contains_key("toneAndStyle"));
        assert!(!report.sections.contains_key("ATS"));

        let back = serde_json::to_value(&report).unwrap();
        assert_eq!(back["toneAndStyle"]["score"], 60);
        assert_eq!(back["ATS"]["tips"][0]["type"], "good");
    }

    #[test]
    fn test_tips_accept_plain_strings_and_objects() {
        let json = r#"{"ATS": {"score": 55, "tips": [
            "Use standard section titles",
            {"type": "improve", "tip": "Add keywords", "explanation": "The JD mentions Kubernetes"}
        ]}}"#;
        let report: FeedbackReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.ats.tips.len(), 2);
        assert_eq!(
            report.ats.tips[0],
            AtsTip::Plain("Use standard section titles".to_string())
        );
        assert!(matches!(
            &report.ats.tips[1],
            AtsTip::Detailed(TipDetail {
                kind: TipKind::Improve,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_tip_kind_is_kept_verbatim() {
        let json = r#"{"ATS": {"score": 40, "tips": [
            {"type": "warning", "tip": "Dates are inconsistent"},
            {"type": "good", "tip": "Concise summary"}
        ]}}"#;
        let report: FeedbackReport = serde_json::from_str(json).unwrap();
        assert!(matches!(&report.ats.tips[0], AtsTip::Unrecognized(_)));
        assert!(matches!(&report.ats.tips[1], AtsTip::Detailed(_)));

        let back = serde_json::to_value(&report).unwrap();
        assert_eq!(back["ATS"]["tips"][0]["type"], "warning");
        assert_eq!(back["ATS"]["tips"][0]["tip"], "Dates are inconsistent");
    }

    #[test]
    fn test_missing_ats_section_is_rejected() {
        let result: Result<FeedbackReport, _> = serde_json::from_str(r#"{"overallScore": 90}"#);
        assert!(result.is_err());
    }
}
