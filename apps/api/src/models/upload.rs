use bytes::Bytes;
use serde::Serialize;

/// Student details entered on the upload form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadForm {
    pub name: String,
    pub age: u32,
    pub grade: String,
}

/// A screenshot attached to the upload form.
///
/// Contents are buffered so every upload attempt can resend each file from its
/// first byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Attachment {
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}
