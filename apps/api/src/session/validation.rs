use thiserror::Error;

use crate::config::FormRules;
use crate::models::{Attachment, UploadForm};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormError {
    #[error("Please complete all fields and upload at least one image.")]
    Incomplete,

    #[error("Age must be between {min} and {max}.")]
    AgeOutOfRange { min: u32, max: u32 },

    #[error("Unsupported file type for '{file_name}'. Accepted types: {accepted}.")]
    UnsupportedFile { file_name: String, accepted: String },
}

/// Raw upload form as received, before any checks.
#[derive(Debug, Default)]
pub struct UploadSubmission {
    pub name: Option<String>,
    pub age: Option<String>,
    pub grade: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Validates an upload submission.
///
/// FAIL conditions:
/// - Missing or blank name, grade or age, or no attachment
/// - Age that is not a whole number within the configured bounds
/// - Attachment whose extension is not an accepted image type
pub fn validate_submission(
    rules: &FormRules,
    submission: UploadSubmission,
) -> Result<(UploadForm, Vec<Attachment>), FormError> {
    let name = non_blank(submission.name).ok_or(FormError::Incomplete)?;
    let grade = non_blank(submission.grade).ok_or(FormError::Incomplete)?;
    let age_raw = non_blank(submission.age).ok_or(FormError::Incomplete)?;
    if submission.attachments.is_empty() {
        return Err(FormError::Incomplete);
    }

    let out_of_range = FormError::AgeOutOfRange {
        min: rules.min_age,
        max: rules.max_age,
    };
    let age: u32 = age_raw.parse().map_err(|_| out_of_range.clone())?;
    if age < rules.min_age || age > rules.max_age {
        return Err(out_of_range);
    }

    for attachment in &submission.attachments {
        let accepted = attachment
            .extension()
            .is_some_and(|ext| rules.supported_file_types.iter().any(|t| *t == ext));
        if !accepted {
            return Err(FormError::UnsupportedFile {
                file_name: attachment.file_name.clone(),
                accepted: rules.supported_file_types.join(", "),
            });
        }
    }

    Ok((UploadForm { name, age, grade }, submission.attachments))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
