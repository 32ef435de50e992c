use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Warning,
    #[default]
    #[serde(other)]
    Info,
}

/// Banner the career workflow attaches to its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    #[serde(rename = "type", default, deserialize_with = "lenient::or_default")]
    pub kind: MessageKind,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerSummary {
    #[serde(default, deserialize_with = "lenient::string")]
    pub core_driver: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub personality: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub work_style: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub learning_style: String,
}

/// How strongly a career field fits the student. Values outside the three
/// known tiers are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Alignment {
    High,
    Moderate,
    Low,
    Other(String),
}

impl Alignment {
    /// Tiers offered by the editor.
    pub const EDITABLE: [Alignment; 3] = [Alignment::High, Alignment::Moderate, Alignment::Low];

    /// Display tier: exact "high", anything mentioning "moderate", else low.
    pub fn css_class(&self) -> &'static str {
        match self {
            Alignment::High => "alignment-high",
            Alignment::Moderate => "alignment-moderate",
            Alignment::Other(raw) if raw.to_lowercase().contains("moderate") => {
                "alignment-moderate"
            }
            _ => "alignment-low",
        }
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::Other("Unknown".to_string())
    }
}

impl From<String> for Alignment {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "high" => Alignment::High,
            "moderate" => Alignment::Moderate,
            "low" => Alignment::Low,
            _ => Alignment::Other(raw),
        }
    }
}

impl From<Alignment> for String {
    fn from(alignment: Alignment) -> Self {
        alignment.to_string()
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::High => f.write_str("High"),
            Alignment::Moderate => f.write_str("Moderate"),
            Alignment::Low => f.write_str("Low"),
            Alignment::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CareerSpace {
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LessAlignedArea {
    #[serde(default, deserialize_with = "lenient::string")]
    pub area: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerField {
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub alignment: Alignment,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub spaces: Vec<CareerSpace>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub less_aligned: Vec<LessAlignedArea>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<UserMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<CareerSummary>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub career_fields: IndexMap<String, CareerField>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of an export request as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportOutcome {
    pub fn exported(document_url: String) -> Self {
        Self {
            success: true,
            document_url: Some(document_url),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            document_url: None,
            error: Some(if error.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                error
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_career_fields_keep_service_order() {
        let career: CareerData = serde_json::from_value(json!({
            "careerFields": {
                "stem": {"title": "STEM", "alignment": "High"},
                "arts": {"title": "Arts", "alignment": "Moderate"},
                "law": {"title": "Law", "alignment": "Low"}
            }
        }))
        .unwrap();
        let keys: Vec<_> = career.career_fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["stem", "arts", "law"]);
    }

    #[test]
    fn test_alignment_parsing_and_display() {
        assert_eq!(Alignment::from("high".to_string()), Alignment::High);
        assert_eq!(Alignment::from("Low".to_string()), Alignment::Low);
        let other = Alignment::from("Moderate-High".to_string());
        assert_eq!(other, Alignment::Other("Moderate-High".to_string()));
        assert_eq!(other.to_string(), "Moderate-High");
        assert_eq!(other.css_class(), "alignment-moderate");
        assert_eq!(Alignment::default().css_class(), "alignment-low");
    }

    #[test]
    fn test_unknown_message_type_falls_back_to_info() {
        let message: UserMessage = serde_json::from_value(json!({
            "type": "celebration",
            "title": "Done",
            "message": "All set"
        }))
        .unwrap();
        assert_eq!(message.kind, MessageKind::Info);
    }

    #[test]
    fn test_null_lists_and_alignment_read_as_absent() {
        let career: CareerData = serde_json::from_value(json!({
            "userMessage": {"title": "Heads up", "message": "Partial result"},
            "careerFields": {
                "stem": {"title": "STEM", "alignment": null, "spaces": null, "lessAligned": null}
            }
        }))
        .unwrap();

        let field = &career.career_fields["stem"];
        assert!(field.spaces.is_empty());
        assert!(field.less_aligned.is_empty());
        assert_eq!(field.alignment, Alignment::default());
        assert_eq!(career.user_message.unwrap().kind, MessageKind::Info);

        let bare: CareerData = serde_json::from_value(json!({"careerFields": null})).unwrap();
        assert!(bare.career_fields.is_empty());

        let typed_null: UserMessage =
            serde_json::from_value(json!({"type": null, "message": "x"})).unwrap();
        assert_eq!(typed_null.kind, MessageKind::Info);
    }

    #[test]
    fn test_less_aligned_uses_camel_case_key() {
        let field = CareerField {
            title: "Finance".to_string(),
            alignment: Alignment::Low,
            less_aligned: vec![LessAlignedArea {
                area: "Auditing".to_string(),
                reason: "Repetitive".to_string(),
            }],
            ..Default::default()
        };
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["lessAligned"][0]["area"], json!("Auditing"));
        assert_eq!(value["alignment"], json!("Low"));
    }

    #[test]
    fn test_failed_export_always_carries_an_error() {
        let outcome = ExportOutcome::failed("");
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Unknown error"));
    }
}
