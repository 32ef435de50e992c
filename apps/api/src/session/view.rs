//! Read model handed to the presentation layer.
//!
//! Everything here is derived from a `Session` on demand and never stored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::report::strip_insight_prefix;
use crate::models::{
    CareerData, CareerSpace, LessAlignedArea, ReportData, StudentInfo, TestKind, UserMessage,
};
use crate::session::store::{Notice, Session};
use crate::session::workflow::{evaluate, visible_actions, Action, WorkflowState};

const ANALYSIS_PENDING: &str = "Analysis pending";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: WorkflowState,
    pub edit_mode: bool,
    pub career_analysis_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career: Option<CareerView>,
    pub actions: Vec<ActionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionView {
    pub action: Action,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReportView {
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub test_key: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub headers: [&'static str; 3],
    pub rows: Vec<RowView>,
    /// Insight text with its stored marker removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
}

/// A table row as displayed: the middle column is the score, or the domain
/// for HIGH5.
#[derive(Debug, Serialize)]
pub struct RowView {
    pub preference: String,
    pub value: String,
    pub meaning: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<UserMessage>,
    pub summary: Vec<SummaryRow>,
    pub fields: Vec<CareerFieldView>,
}

#[derive(Debug, Serialize)]
pub struct SummaryRow {
    pub category: &'static str,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerFieldView {
    pub key: String,
    pub title: String,
    pub alignment: String,
    pub alignment_class: &'static str,
    pub description: String,
    pub spaces: Vec<CareerSpace>,
    pub less_aligned: Vec<LessAlignedArea>,
}

impl SessionView {
    pub fn build(session_id: Uuid, session: &Session) -> Self {
        let state = evaluate(session);
        let actions = visible_actions(session)
            .into_iter()
            .map(|action| ActionView {
                action,
                label: action.label(session),
            })
            .collect();

        Self {
            session_id,
            state,
            edit_mode: session.edit_mode(),
            career_analysis_requested: session.career_analysis_requested(),
            student: session
                .form_submitted()
                .then(|| session.student_info()),
            report: session.report_data().map(ReportView::from_report),
            career: session.career_data().map(CareerView::from_career),
            actions,
            notice: session.notice().cloned(),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }
}

impl ReportView {
    /// Sections in fixed display order. Tests with no rows are skipped.
    pub fn from_report(report: &ReportData) -> Self {
        let sections = TestKind::ALL
            .into_iter()
            .filter(|kind| !report.rows(*kind).is_empty())
            .map(|kind| SectionView {
                test_key: kind.key(),
                title: kind.title(),
                subtitle: kind.subtitle(),
                headers: kind.headers(),
                rows: report
                    .rows(kind)
                    .iter()
                    .map(|row| RowView {
                        preference: row.preference.clone(),
                        value: if kind.has_score() {
                            row.score_text()
                        } else {
                            row.domain_text()
                        }
                        .unwrap_or_default(),
                        meaning: row.meaning.clone(),
                    })
                    .collect(),
                insight: report
                    .insight_lines
                    .get(kind.position())
                    .map(|line| strip_insight_prefix(line).to_string()),
            })
            .collect();
        Self { sections }
    }
}

impl CareerView {
    pub fn from_career(career: &CareerData) -> Self {
        let summary = career.summary.clone().unwrap_or_default();
        let pending = |value: String| {
            if value.trim().is_empty() {
                ANALYSIS_PENDING.to_string()
            } else {
                value
            }
        };

        Self {
            user_message: career.user_message.clone(),
            summary: vec![
                SummaryRow {
                    category: "Core Drive",
                    value: pending(summary.core_driver),
                },
                SummaryRow {
                    category: "Personality",
                    value: pending(summary.personality),
                },
                SummaryRow {
                    category: "Work Style",
                    value: pending(summary.work_style),
                },
                SummaryRow {
                    category: "Learning Style",
                    value: pending(summary.learning_style),
                },
            ],
            fields: career
                .career_fields
                .iter()
                .map(|(key, field)| CareerFieldView {
                    key: key.clone(),
                    title: field.title.clone(),
                    alignment: field.alignment.to_string(),
                    alignment_class: field.alignment.css_class(),
                    description: field.description.clone(),
                    spaces: field.spaces.clone(),
                    less_aligned: field.less_aligned.clone(),
                })
                .collect(),
        }
    }
}
