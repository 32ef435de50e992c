//! Payload shapes exchanged with the remote analysis service.
//!
//! Field names are fixed by the hosted workflow and must not change. Unknown
//! fields are carried through untouched so edits and exports send back exactly
//! what the service produced.

pub mod career;
pub mod report;
pub mod upload;

pub use career::{
    Alignment, CareerData, CareerField, CareerSpace, ExportOutcome, LessAlignedArea, UserMessage,
};
pub use report::{ReportData, StudentInfo, TestData, TestKind};
pub use upload::{Attachment, UploadForm};

/// Lenient deserializers. The workflow sometimes emits numbers where a string
/// is expected, strings where a number is expected (age), and `null` where a
/// list or map is expected.
pub(crate) mod lenient {
    use serde::{de::Error, Deserialize, Deserializer};
    use serde_json::Value;

    /// Display text of a scalar. Numbers keep their JSON spelling.
    pub fn scalar_text(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Value to store for edited text: a number stays a number when the text
    /// still parses as one.
    pub fn retype(previous: Option<&Value>, text: String) -> Value {
        match previous {
            Some(Value::Number(_)) => serde_json::from_str::<serde_json::Number>(text.trim())
                .map(Value::Number)
                .unwrap_or(Value::String(text)),
            _ => Value::String(text),
        }
    }

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(scalar_text(&Value::deserialize(deserializer)?).unwrap_or_default())
    }

    /// `null` reads as the type's default (empty list, empty map, ...).
    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub fn age<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(0),
            Value::Number(n) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| D::Error::custom(format!("age out of range: {n}"))),
            Value::String(s) if s.trim().is_empty() => Ok(0),
            Value::String(s) => s
                .trim()
                .parse::<u32>()
                .map_err(|_| D::Error::custom(format!("age is not a whole number: {s}"))),
            other => Err(D::Error::custom(format!("unexpected age value: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::lenient;

    #[test]
    fn test_scalar_text_keeps_number_spelling() {
        assert_eq!(lenient::scalar_text(&json!(31)).as_deref(), Some("31"));
        assert_eq!(lenient::scalar_text(&json!(4.5)).as_deref(), Some("4.5"));
        assert_eq!(lenient::scalar_text(&json!("62%")).as_deref(), Some("62%"));
        assert_eq!(lenient::scalar_text(&Value::Null), None);
    }

    #[test]
    fn test_retype_keeps_numbers_numeric() {
        assert_eq!(lenient::retype(Some(&json!(31)), " 35 ".to_string()), json!(35));
        assert_eq!(lenient::retype(Some(&json!(31)), "high".to_string()), json!("high"));
        assert_eq!(lenient::retype(Some(&json!("31")), "35".to_string()), json!("35"));
        assert_eq!(lenient::retype(None, "35".to_string()), json!("35"));
    }
}
