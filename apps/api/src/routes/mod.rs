pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

/// Screenshots can be large; axum's 2 MB default is too small for a batch.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/upload",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/sessions/:id/edit-mode",
            post(handlers::handle_toggle_edit_mode),
        )
        .route(
            "/api/v1/sessions/:id/edits",
            patch(handlers::handle_apply_edit),
        )
        .route(
            "/api/v1/sessions/:id/save",
            post(handlers::handle_save_changes),
        )
        .route(
            "/api/v1/sessions/:id/reset",
            post(handlers::handle_reset_changes),
        )
        .route(
            "/api/v1/sessions/:id/career",
            post(handlers::handle_career_analysis),
        )
        .route("/api/v1/sessions/:id/export", post(handlers::handle_export))
        .route(
            "/api/v1/sessions/:id/new-assessment",
            post(handlers::handle_new_assessment),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::FormRules;
    use crate::models::ExportOutcome;
    use crate::session::store::SessionStore;
    use crate::session::workflow::tests::{sample_career, sample_report, FakeService};
    use crate::session::workflow::WorkflowController;

    const BOUNDARY: &str = "assessment-boundary";

    fn app(service: Arc<FakeService>) -> Router {
        build_router(AppState {
            sessions: SessionStore::new(),
            controller: Arc::new(WorkflowController::new(service, FormRules::default())),
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn empty(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload_request(uri: &str, age: &str, file_name: &str) -> Request<Body> {
        let mut body = String::new();
        for (name, value) in [("name", "Asha"), ("age", age), ("grade", "7th")] {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n\
             Content-Type: image/png\r\n\r\nfake image\r\n--{BOUNDARY}--\r\n"
        ));

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn create(app: &Router) -> String {
        let (status, body) = send(app, empty(Method::POST, "/api/v1/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["state"], "awaiting_upload");
        body["sessionId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(Arc::new(FakeService::default()));
        let (status, body) = send(&app, empty(Method::GET, "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app(Arc::new(FakeService::default()));
        let uri = format!("/api/v1/sessions/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, empty(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_session() {
        let app = app(Arc::new(FakeService::default()));
        let id = create(&app).await;
        let uri = format!("/api/v1/sessions/{id}");

        let (status, _) = send(&app, empty(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, empty(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, body) = send(&app, empty(Method::GET, "/health")).await;
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn test_full_assessment_flow() {
        let service = Arc::new(FakeService::with_report(sample_report()));
        service.push_career(Ok(sample_career()));
        service.push_export(Ok(ExportOutcome::exported(
            "https://docs.google.com/document/d/abc".to_string(),
        )));
        let app = app(service.clone());
        let id = create(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        let (status, body) = send(&app, upload_request(&format!("{base}/upload"), "12", "mbti.png")).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["state"], "report_ready");
        assert_eq!(body["report"]["sections"][0]["insight"], "foo");
        assert_eq!(body["notice"]["message"], "Report ready!");

        let (status, body) = send(&app, empty(Method::POST, &format!("{base}/edit-mode"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["editMode"], true);

        let edit = json!({
            "path": {"kind": "testRow", "testKey": "test16PersonalityData", "row": 0, "column": "score"},
            "value": "70%"
        });
        let (status, body) = send(&app, json_request(Method::PATCH, &format!("{base}/edits"), edit)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["report"]["sections"][0]["rows"][0]["value"], "70%");

        let (status, body) = send(&app, empty(Method::POST, &format!("{base}/save"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["editMode"], false);

        let (status, body) = send(&app, empty(Method::POST, &format!("{base}/career"))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["career"]["fields"][0]["alignmentClass"], "alignment-high");
        let labels: Vec<_> = body["actions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["label"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            labels,
            vec![
                "Edit Report",
                "Career Reanalysis",
                "Export to Google Docs",
                "New Assessment"
            ]
        );
        // The saved edit reaches the career request.
        let requests = service.career_requests.lock().unwrap().clone();
        assert_eq!(
            requests[0].1["test16PersonalityData"][0].score_text().as_deref(),
            Some("70%")
        );

        let (status, body) = send(&app, empty(Method::POST, &format!("{base}/export"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["export"]["success"], true);
        assert_eq!(
            body["export"]["documentUrl"],
            "https://docs.google.com/document/d/abc"
        );

        let (status, body) = send(&app, empty(Method::POST, &format!("{base}/new-assessment"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "awaiting_upload");
        assert!(body.get("report").is_none());
    }

    #[tokio::test]
    async fn test_invalid_upload_is_400_and_stays_on_form() {
        let service = Arc::new(FakeService::with_report(sample_report()));
        let app = app(service.clone());
        let id = create(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        let (status, body) = send(&app, upload_request(&format!("{base}/upload"), "30", "mbti.png")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = send(&app, upload_request(&format!("{base}/upload"), "12", "scan.pdf")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("scan.pdf"));

        let (_, body) = send(&app, empty(Method::GET, &base)).await;
        assert_eq!(body["state"], "awaiting_upload");
        assert!(service.upload_files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_502_with_notice() {
        let service = Arc::new(FakeService::with_report(sample_report()));
        let app = app(service.clone());
        let id = create(&app).await;
        let base = format!("/api/v1/sessions/{id}");
        send(&app, upload_request(&format!("{base}/upload"), "12", "mbti.png")).await;

        // No scripted career response: the fake fails the call.
        let (status, body) = send(&app, empty(Method::POST, &format!("{base}/career"))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Career analysis failed:"));

        let (_, body) = send(&app, empty(Method::GET, &base)).await;
        assert_eq!(body["state"], "report_ready");
        assert_eq!(body["careerAnalysisRequested"], false);
        assert_eq!(body["notice"]["level"], "error");
    }

    #[tokio::test]
    async fn test_unavailable_action_is_409() {
        let app = app(Arc::new(FakeService::default()));
        let id = create(&app).await;

        let (status, body) = send(
            &app,
            empty(Method::POST, &format!("/api/v1/sessions/{id}/export")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "ACTION_NOT_AVAILABLE");
    }

    #[tokio::test]
    async fn test_read_only_edit_is_rejected() {
        let app = app(Arc::new(FakeService::with_report(sample_report())));
        let id = create(&app).await;
        let base = format!("/api/v1/sessions/{id}");
        send(&app, upload_request(&format!("{base}/upload"), "12", "mbti.png")).await;
        send(&app, empty(Method::POST, &format!("{base}/edit-mode"))).await;

        let edit = json!({
            "path": {"kind": "testRow", "testKey": "test16PersonalityData", "row": 0, "column": "preference"},
            "value": "I"
        });
        let (status, _) = send(&app, json_request(Method::PATCH, &format!("{base}/edits"), edit)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
