use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Attachment, ExportOutcome};
use crate::session::edits::FieldEdit;
use crate::session::store::Session;
use crate::session::validation::UploadSubmission;
use crate::session::view::SessionView;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub export: ExportOutcome,
    pub session: SessionView,
}

async fn find_session(state: &AppState, id: Uuid) -> Result<Arc<Mutex<Session>>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionView>) {
    let (id, session) = state.sessions.create().await;
    let session = session.lock().await;
    (StatusCode::CREATED, Json(SessionView::build(id, &session)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, id).await?;
    let session = session.lock().await;
    Ok(Json(SessionView::build(id, &session)))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// POST /api/v1/sessions/:id/upload
///
/// Text fields `name`, `age`, `grade`; every part carrying a file name is an
/// attachment. Blocks until the report has been generated.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, id).await?;
    let submission = read_submission(multipart).await?;

    let mut session = session.lock().await;
    state.controller.submit_upload(&mut session, submission).await?;
    Ok(Json(SessionView::build(id, &session)))
}

async fn read_submission(mut multipart: Multipart) -> Result<UploadSubmission, AppError> {
    let mut submission = UploadSubmission::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            // Browsers send an empty part for an untouched file input.
            if file_name.is_empty() && data.is_empty() {
                continue;
            }
            debug!("Received attachment {file_name} ({} bytes)", data.len());
            submission.attachments.push(Attachment {
                file_name,
                content_type,
                data,
            });
            continue;
        }

        let text = field.text().await?;
        match field_name.as_str() {
            "name" => submission.name = Some(text),
            "age" => submission.age = Some(text),
            "grade" => submission.grade = Some(text),
            other => debug!("Ignoring unknown upload field '{other}'"),
        }
    }

    Ok(submission)
}

/// POST /api/v1/sessions/:id/edit-mode
pub async fn handle_toggle_edit_mode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    state.controller.toggle_edit_mode(&mut session)?;
    Ok(Json(SessionView::build(id, &session)))
}

/// PATCH /api/v1/sessions/:id/edits
pub async fn handle_apply_edit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<FieldEdit>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    state.controller.apply_edit(&mut session, &edit)?;
    Ok(Json(SessionView::build(id, &session)))
}

/// POST /api/v1/sessions/:id/save
pub async fn handle_save_changes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    state.controller.save_changes(&mut session)?;
    Ok(Json(SessionView::build(id, &session)))
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset_changes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    state.controller.reset_changes(&mut session)?;
    Ok(Json(SessionView::build(id, &session)))
}

/// POST /api/v1/sessions/:id/career
pub async fn handle_career_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    state.controller.request_career(&mut session).await?;
    Ok(Json(SessionView::build(id, &session)))
}

/// POST /api/v1/sessions/:id/export
pub async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExportResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    let export = state.controller.export(&mut session).await?;
    Ok(Json(ExportResponse {
        export,
        session: SessionView::build(id, &session),
    }))
}

/// POST /api/v1/sessions/:id/new-assessment
pub async fn handle_new_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    state.controller.new_assessment(&mut session)?;
    Ok(Json(SessionView::build(id, &session)))
}
