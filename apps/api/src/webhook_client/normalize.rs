//! Response-shape normalization for the three webhooks.
//!
//! The workflow wraps its output inconsistently: sometimes in a one-element
//! list, and the career workflow sometimes nests the result under
//! `reportData.careerAnalysis`. Each endpoint gets one function here with a
//! fixed fallback order.

use serde_json::Value;

use super::WebhookError;
use crate::models::ExportOutcome;

const BODY_PREVIEW_CHARS: usize = 500;

/// Parses a response body as JSON. An unparseable body is an invalid response.
pub fn parse_body(body: &[u8]) -> Result<Value, WebhookError> {
    serde_json::from_slice(body).map_err(|_| {
        let text = String::from_utf8_lossy(body);
        let preview: String = text.chars().take(BODY_PREVIEW_CHARS).collect();
        WebhookError::InvalidResponse(format!("Invalid JSON response: {preview}"))
    })
}

/// Takes the first element of a non-empty list; anything else is returned as is.
pub fn unwrap_list(value: Value) -> Value {
    match value {
        Value::Array(items) if !items.is_empty() => {
            items.into_iter().next().unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Null, false, zero and empty strings, lists and objects carry no payload.
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Upload: body must be non-empty JSON; a wrapping list is unwrapped.
pub fn upload_payload(body: &[u8]) -> Result<Value, WebhookError> {
    let payload = parse_body(body)?;
    if is_empty_payload(&payload) {
        return Err(WebhookError::InvalidResponse(
            "Empty response received from server".to_string(),
        ));
    }
    Ok(unwrap_list(payload))
}

/// Career: list unwrap, then the `reportData.careerAnalysis` envelope, then the
/// raw value as a last resort.
pub fn career_payload(value: Value) -> Value {
    let mut value = unwrap_list(value);
    let nested = value
        .get_mut("reportData")
        .and_then(|report| report.get_mut("careerAnalysis"))
        .filter(|analysis| !is_empty_payload(analysis))
        .map(Value::take);
    nested.unwrap_or(value)
}

/// Export: list unwrap, then success is decided by the presence of `documentUrl`.
pub fn export_outcome(value: Value) -> ExportOutcome {
    let value = unwrap_list(value);
    match value.get("documentUrl").and_then(Value::as_str) {
        Some(url) if !url.trim().is_empty() => ExportOutcome::exported(url.to_string()),
        _ => {
            let reason = value
                .get("error")
                .and_then(Value::as_str)
                .filter(|e| !e.trim().is_empty())
                .unwrap_or("No document URL returned from export service");
            ExportOutcome::failed(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_list_takes_first_element() {
        assert_eq!(unwrap_list(json!([{"a": 1}])), json!({"a": 1}));
        assert_eq!(unwrap_list(json!({"a": 1})), json!({"a": 1}));
        assert_eq!(unwrap_list(json!([])), json!([]));
    }

    #[test]
    fn test_upload_payload_rejects_empty_bodies() {
        for body in [&b"{}"[..], &b"[]"[..], &b"null"[..], &b"\"\""[..]] {
            let err = upload_payload(body).unwrap_err();
            assert!(matches!(err, WebhookError::InvalidResponse(_)), "{body:?}");
        }
    }

    #[test]
    fn test_upload_payload_rejects_non_json() {
        let err = upload_payload(b"<html>Bad Gateway</html>").unwrap_err();
        match err {
            WebhookError::InvalidResponse(msg) => assert!(msg.contains("Bad Gateway")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_upload_payload_truncates_preview() {
        let body = "x".repeat(2_000);
        match upload_payload(body.as_bytes()).unwrap_err() {
            WebhookError::InvalidResponse(msg) => {
                assert!(msg.len() < 600);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_upload_payload_unwraps_list() {
        let value = upload_payload(br#"[{"insightLines": ["INSIGHT: a"]}]"#).unwrap();
        assert_eq!(value, json!({"insightLines": ["INSIGHT: a"]}));
    }

    #[test]
    fn test_career_payload_unwraps_envelope() {
        let value = json!([{"reportData": {"careerAnalysis": {"summary": {"coreDriver": "x"}}}}]);
        assert_eq!(
            career_payload(value),
            json!({"summary": {"coreDriver": "x"}})
        );
    }

    #[test]
    fn test_career_payload_falls_back_to_flat_shape() {
        let flat = json!({"careerFields": {}, "reportData": {"other": 1}});
        assert_eq!(career_payload(flat.clone()), flat);
    }

    #[test]
    fn test_career_payload_ignores_empty_envelope() {
        let value = json!({"reportData": {"careerAnalysis": {}}, "summary": {}});
        assert_eq!(career_payload(value.clone()), value);
    }

    #[test]
    fn test_export_outcome_with_url() {
        let outcome = export_outcome(json!([{"documentUrl": "https://docs.example/d/1"}]));
        assert!(outcome.success);
        assert_eq!(outcome.document_url.as_deref(), Some("https://docs.example/d/1"));
    }

    #[test]
    fn test_export_outcome_missing_url_is_failure() {
        let outcome = export_outcome(json!({"success": true}));
        assert!(!outcome.success);
        assert!(!outcome.error.unwrap().is_empty());
    }

    #[test]
    fn test_export_outcome_keeps_service_error() {
        let outcome = export_outcome(json!({"success": false, "error": "quota exceeded"}));
        assert_eq!(outcome.error.as_deref(), Some("quota exceeded"));
    }
}
