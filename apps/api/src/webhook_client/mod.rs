/// Webhook client — the single point of entry for all calls to the remote
/// analysis workflow (report upload, career analysis, Google Docs export).
///
/// ARCHITECTURAL RULE: No other module may call the workflow webhooks directly.
/// Session code talks to the service through the `AnalysisService` trait.
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{TimeoutPair, WebhookConfig};
use crate::models::{
    Attachment, CareerData, ExportOutcome, ReportData, StudentInfo, TestData, UploadForm,
};

pub mod endpoints;
pub mod normalize;

const USER_AGENT: &str = concat!("assessment-api/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors worth another attempt: the request never completed on the wire.
pub(crate) trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for WebhookError {
    fn is_transient(&self) -> bool {
        match self {
            WebhookError::Transport(e) => {
                e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
            }
            WebhookError::Status { .. } | WebhookError::InvalidResponse(_) => false,
        }
    }
}

/// The remote analysis workflow as seen by the session controller.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Sends the upload form and screenshots; returns the extracted report.
    async fn upload_and_analyze(
        &self,
        form: &UploadForm,
        attachments: &[Attachment],
    ) -> Result<ReportData, WebhookError>;

    async fn request_career_analysis(
        &self,
        student_info: &StudentInfo,
        test_data: &TestData,
        insight_lines: &[String],
    ) -> Result<CareerData, WebhookError>;

    async fn request_export(
        &self,
        report: &ReportData,
        career: Option<&CareerData>,
    ) -> Result<ExportOutcome, WebhookError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CareerRequest<'a> {
    student_info: &'a StudentInfo,
    edited_test_data: &'a TestData,
    edited_insights: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest<'a> {
    psychometric_data: &'a ReportData,
    career_data: Option<&'a CareerData>,
}

/// One HTTP client per timeout profile; the connect timeout is a client setting.
#[derive(Clone)]
struct Endpoint {
    http: Client,
    url: String,
    transfer_timeout: Duration,
}

impl Endpoint {
    fn new(base_url: &str, path: &str, timeouts: TimeoutPair) -> Result<Self, WebhookError> {
        let http = Client::builder()
            .connect_timeout(timeouts.connect)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()?;
        Ok(Self {
            http,
            url: endpoints::url(base_url, path),
            transfer_timeout: timeouts.transfer,
        })
    }
}

/// The webhook client used by every session.
/// Wraps the three workflow endpoints with the upload retry policy and
/// response normalization.
#[derive(Clone)]
pub struct WebhookClient {
    upload: Endpoint,
    career: Endpoint,
    export: Endpoint,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, WebhookError> {
        Ok(Self {
            upload: Endpoint::new(
                &config.base_url,
                endpoints::REPORT_UPLOAD,
                config.upload_timeouts,
            )?,
            career: Endpoint::new(
                &config.base_url,
                endpoints::CAREER_ANALYSIS,
                config.json_timeouts,
            )?,
            export: Endpoint::new(&config.base_url, endpoints::EXPORT, config.json_timeouts)?,
            max_attempts: config.upload_max_attempts.max(1),
            retry_backoff: config.upload_retry_backoff,
        })
    }

    /// One multipart POST. Attachment parts are rebuilt from the buffered bytes
    /// so every attempt sends each file from its start.
    async fn upload_once(
        &self,
        form: &UploadForm,
        attachments: &[Attachment],
    ) -> Result<Value, WebhookError> {
        let mut multipart = Form::new()
            .text("name", form.name.clone())
            .text("age", form.age.to_string())
            .text("grade", form.grade.clone())
            .text("fileCount", attachments.len().to_string());

        for (index, attachment) in attachments.iter().enumerate() {
            let mut part =
                Part::stream_with_length(attachment.data.clone(), attachment.data.len() as u64)
                    .file_name(attachment.file_name.clone());
            if let Some(content_type) = &attachment.content_type {
                part = part.mime_str(content_type)?;
            }
            multipart = multipart.part(format!("data{index}"), part);
        }

        let response = self
            .upload
            .http
            .post(&self.upload.url)
            .timeout(self.upload.transfer_timeout)
            .multipart(multipart)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WebhookError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        normalize::upload_payload(&body)
    }

    /// Single JSON POST with no retry. Returns the parsed body.
    async fn post_json<B: Serialize + ?Sized>(
        endpoint: &Endpoint,
        body: &B,
    ) -> Result<Value, WebhookError> {
        let response = endpoint
            .http
            .post(&endpoint.url)
            .timeout(endpoint.transfer_timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WebhookError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        normalize::parse_body(&body)
    }
}

#[async_trait]
impl AnalysisService for WebhookClient {
    async fn upload_and_analyze(
        &self,
        form: &UploadForm,
        attachments: &[Attachment],
    ) -> Result<ReportData, WebhookError> {
        info!(
            "Uploading {} screenshot(s) for {} to the analysis workflow",
            attachments.len(),
            form.name
        );
        let payload = retry_transient(self.max_attempts, self.retry_backoff, |_| {
            self.upload_once(form, attachments)
        })
        .await?;
        let report: ReportData = decode(payload)?;
        debug!(
            "Report received: {} test section(s), {} insight line(s)",
            report.test_data.len(),
            report.insight_lines.len()
        );
        Ok(report)
    }

    async fn request_career_analysis(
        &self,
        student_info: &StudentInfo,
        test_data: &TestData,
        insight_lines: &[String],
    ) -> Result<CareerData, WebhookError> {
        let request = CareerRequest {
            student_info,
            edited_test_data: test_data,
            edited_insights: insight_lines,
        };
        let raw = Self::post_json(&self.career, &request).await?;
        let career: CareerData = decode(normalize::career_payload(raw))?;
        debug!(
            "Career analysis received: {} career field(s)",
            career.career_fields.len()
        );
        Ok(career)
    }

    async fn request_export(
        &self,
        report: &ReportData,
        career: Option<&CareerData>,
    ) -> Result<ExportOutcome, WebhookError> {
        let request = ExportRequest {
            psychometric_data: report,
            career_data: career,
        };
        let raw = Self::post_json(&self.export, &request).await?;
        Ok(normalize::export_outcome(raw))
    }
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, WebhookError> {
    serde_json::from_value(payload)
        .map_err(|e| WebhookError::InvalidResponse(format!("Unexpected payload shape: {e}")))
}

/// Runs `op` up to `max_attempts` times, sleeping `backoff` between attempts.
/// Only transient errors are retried; the last error is returned when attempts
/// run out. `op` receives the 1-based attempt number.
pub(crate) async fn retry_transient<T, E, F, Fut>(
    max_attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    "Connection issue on attempt {}/{}: {}; retrying after {}ms...",
                    attempt,
                    max_attempts,
                    e,
                    backoff.as_millis()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
