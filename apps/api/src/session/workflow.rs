//! Workflow Controller — decides which step of the assessment a session is on
//! and drives every transition.
//!
//! State is derived, never stored: `evaluate` walks a fixed priority chain over
//! the session flags and the first match wins. Every user action mutates the
//! flags and then re-runs the chain, performing the webhook call owned by any
//! processing state it lands in.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::FormRules;
use crate::models::{Attachment, ExportOutcome};
use crate::session::edits::{apply_career_edit, apply_report_edit, EditError, FieldEdit};
use crate::session::store::{Notice, Session};
use crate::session::validation::{validate_submission, FormError, UploadSubmission};
use crate::webhook_client::{AnalysisService, WebhookError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    AwaitingUpload,
    ProcessingReport,
    ProcessingCareer,
    ReportReady,
}

/// The priority chain. Order matters; do not reorder the arms.
pub fn evaluate(session: &Session) -> WorkflowState {
    if !session.form_submitted() {
        WorkflowState::AwaitingUpload
    } else if session.report_data().is_none() {
        WorkflowState::ProcessingReport
    } else if session.career_analysis_requested() && session.career_data().is_none() {
        WorkflowState::ProcessingCareer
    } else {
        WorkflowState::ReportReady
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ToggleEdit,
    ResetChanges,
    SaveChanges,
    GenerateCareerPathways,
    CareerReanalysis,
    ExportToGoogleDocs,
    NewAssessment,
}

impl Action {
    pub fn label(self, session: &Session) -> &'static str {
        match self {
            Action::ToggleEdit if session.edit_mode() => "View Report",
            Action::ToggleEdit => "Edit Report",
            Action::ResetChanges => "Reset Changes",
            Action::SaveChanges => "Save Changes",
            Action::GenerateCareerPathways => "Generate Career Pathways",
            Action::CareerReanalysis => "Career Reanalysis",
            Action::ExportToGoogleDocs => "Export to Google Docs",
            Action::NewAssessment => "New Assessment",
        }
    }
}

/// Buttons shown under the report, in display order.
pub fn visible_actions(session: &Session) -> Vec<Action> {
    if evaluate(session) != WorkflowState::ReportReady {
        return Vec::new();
    }

    let mut actions = vec![Action::ToggleEdit];
    if session.edit_mode() {
        actions.extend([Action::ResetChanges, Action::SaveChanges]);
    }
    if session.career_data().is_some() {
        actions.extend([
            Action::CareerReanalysis,
            Action::ExportToGoogleDocs,
            Action::NewAssessment,
        ]);
    } else {
        if !session.edit_mode() {
            actions.push(Action::GenerateCareerPathways);
        }
        actions.push(Action::NewAssessment);
    }
    actions
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("'{action}' is not available while {state:?}")]
    NotAvailable {
        action: &'static str,
        state: WorkflowState,
    },

    #[error("{0}")]
    Upstream(String),
}

/// The webhook operation a failure came from, for user-facing messages.
#[derive(Debug, Clone, Copy)]
enum Operation {
    Report,
    Career,
    Export,
}

impl Operation {
    fn failure_message(self, err: &WebhookError) -> String {
        let operation = match self {
            Operation::Report => "Report generation",
            Operation::Career => "Career analysis",
            Operation::Export => "Export",
        };
        format!("{operation} failed: {err}")
    }
}

pub struct WorkflowController {
    service: Arc<dyn AnalysisService>,
    rules: FormRules,
}

impl WorkflowController {
    pub fn new(service: Arc<dyn AnalysisService>, rules: FormRules) -> Self {
        Self { service, rules }
    }

    /// Re-evaluates the chain until the session settles in a resting state,
    /// running the webhook call of each processing state it passes through.
    pub async fn advance(&self, session: &mut Session) -> Result<WorkflowState, WorkflowError> {
        loop {
            match evaluate(session) {
                WorkflowState::ProcessingReport => self.process_report(session).await?,
                WorkflowState::ProcessingCareer => self.process_career(session).await?,
                resting => return Ok(resting),
            }
        }
    }

    async fn process_report(&self, session: &mut Session) -> Result<(), WorkflowError> {
        let attachments: Vec<Attachment> = session.take_attachments();
        let Some(form) = session.form().cloned() else {
            session.reset_form();
            return Err(FormError::Incomplete.into());
        };

        match self.service.upload_and_analyze(&form, &attachments).await {
            Ok(report) => {
                info!("Report ready for {}", form.name);
                session.store_report_data(report);
                session.set_notice(Notice::success("Report ready!"));
                Ok(())
            }
            Err(e) => {
                let message = Operation::Report.failure_message(&e);
                error!("{message}");
                session.reset_form();
                session.set_notice(Notice::error(message.clone()));
                Err(WorkflowError::Upstream(message))
            }
        }
    }

    async fn process_career(&self, session: &mut Session) -> Result<(), WorkflowError> {
        let student_info = session.student_info();
        let result = match session.report_data() {
            Some(report) => {
                self.service
                    .request_career_analysis(&student_info, &report.test_data, &report.insight_lines)
                    .await
            }
            None => {
                session.set_career_analysis_requested(false);
                return Ok(());
            }
        };

        match result {
            Ok(career) => {
                info!(
                    "Career analysis completed with {} field(s)",
                    career.career_fields.len()
                );
                let notice = career
                    .user_message
                    .as_ref()
                    .map(Notice::from)
                    .filter(|notice| !notice.message.is_empty())
                    .unwrap_or_else(|| Notice::success("Career analysis completed!"));
                session.store_career_data(Some(career));
                session.set_notice(notice);
                Ok(())
            }
            Err(e) => {
                let message = Operation::Career.failure_message(&e);
                error!("{message}");
                session.set_career_analysis_requested(false);
                session.set_notice(Notice::error(message.clone()));
                Err(WorkflowError::Upstream(message))
            }
        }
    }

    fn ensure_available(session: &Session, action: Action) -> Result<(), WorkflowError> {
        if visible_actions(session).contains(&action) {
            Ok(())
        } else {
            warn!("Rejected action {:?} in state {:?}", action, evaluate(session));
            Err(WorkflowError::NotAvailable {
                action: action.label(session),
                state: evaluate(session),
            })
        }
    }

    /// Validates the upload form, stores it and processes the report.
    pub async fn submit_upload(
        &self,
        session: &mut Session,
        submission: UploadSubmission,
    ) -> Result<WorkflowState, WorkflowError> {
        let state = evaluate(session);
        if state != WorkflowState::AwaitingUpload {
            return Err(WorkflowError::NotAvailable {
                action: "Generate Report",
                state,
            });
        }
        session.clear_notice();
        let (form, attachments) = validate_submission(&self.rules, submission)?;
        session.store_form_data(form, attachments);
        self.advance(session).await
    }

    pub fn toggle_edit_mode(&self, session: &mut Session) -> Result<WorkflowState, WorkflowError> {
        Self::ensure_available(session, Action::ToggleEdit)?;
        session.clear_notice();
        session.toggle_edit_mode();
        Ok(evaluate(session))
    }

    pub fn reset_changes(&self, session: &mut Session) -> Result<WorkflowState, WorkflowError> {
        Self::ensure_available(session, Action::ResetChanges)?;
        session.reset_changes();
        session.clear_notice();
        Ok(evaluate(session))
    }

    pub fn save_changes(&self, session: &mut Session) -> Result<WorkflowState, WorkflowError> {
        Self::ensure_available(session, Action::SaveChanges)?;
        session.save_changes();
        session.set_notice(Notice::success("Changes saved!"));
        Ok(evaluate(session))
    }

    /// Applies one field edit to the working copy. Edit mode only.
    pub fn apply_edit(
        &self,
        session: &mut Session,
        edit: &FieldEdit,
    ) -> Result<WorkflowState, WorkflowError> {
        let state = evaluate(session);
        if state != WorkflowState::ReportReady || !session.edit_mode() {
            return Err(WorkflowError::NotAvailable {
                action: "Edit field",
                state,
            });
        }

        if edit.path.targets_report() {
            let report = session.report_data_mut().ok_or(EditError::NoReport)?;
            apply_report_edit(report, edit)?;
        } else {
            let career = session.career_data_mut().ok_or(EditError::NoCareerData)?;
            apply_career_edit(career, edit)?;
        }
        Ok(state)
    }

    /// Generate Career Pathways, or Career Reanalysis when a result exists.
    pub async fn request_career(
        &self,
        session: &mut Session,
    ) -> Result<WorkflowState, WorkflowError> {
        if session.career_data().is_some() {
            Self::ensure_available(session, Action::CareerReanalysis)?;
            session.request_career_reanalysis();
        } else {
            Self::ensure_available(session, Action::GenerateCareerPathways)?;
            session.request_career_analysis();
        }
        session.clear_notice();
        self.advance(session).await
    }

    /// Sends the report and career analysis to the export workflow. Failures
    /// are returned as an unsuccessful outcome rather than an error.
    pub async fn export(&self, session: &mut Session) -> Result<ExportOutcome, WorkflowError> {
        Self::ensure_available(session, Action::ExportToGoogleDocs)?;

        let result = match session.report_data() {
            Some(report) => {
                self.service
                    .request_export(report, session.career_data())
                    .await
            }
            None => return Err(EditError::NoReport.into()),
        };

        let outcome = result.unwrap_or_else(|e| {
            ExportOutcome::failed(Operation::Export.failure_message(&e))
        });

        if outcome.success {
            info!("Report exported to Google Docs");
            session.set_notice(Notice::success(
                "Report exported to Google Docs successfully!",
            ));
        } else {
            let reason = outcome.error.as_deref().unwrap_or("Unknown error");
            warn!("Export failed: {reason}");
            session.set_notice(Notice::error(format!("Export failed: {reason}")));
        }
        Ok(outcome)
    }

    pub fn new_assessment(&self, session: &mut Session) -> Result<WorkflowState, WorkflowError> {
        Self::ensure_available(session, Action::NewAssessment)?;
        session.reset_all();
        info!("Session reset for a new assessment");
        Ok(evaluate(session))
    }
}
