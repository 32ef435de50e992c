// Fixed webhook paths of the hosted workflow, relative to WEBHOOK_BASE_URL.
// These are integration contracts with the remote service; do not rename.

pub const REPORT_UPLOAD: &str = "/google-report-upload";
pub const CAREER_ANALYSIS: &str = "/google-career-analysis";
pub const EXPORT: &str = "/google-export";

pub fn url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
