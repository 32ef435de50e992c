//! Edit Reconciler — applies one `(path, value)` edit to the working copy of
//! the report or career data.
//!
//! Lists are addressed by position. Rows cannot be added or removed; an index
//! outside the current list is rejected.

use serde::Deserialize;
use thiserror::Error;

use crate::models::lenient;
use crate::models::report::with_insight_prefix;
use crate::models::{Alignment, CareerData, ReportData, TestKind};

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("No report data to edit")]
    NoReport,

    #[error("No career data to edit")]
    NoCareerData,

    #[error("Unknown field: {0}")]
    UnknownPath(String),

    #[error("Field is read-only: {0}")]
    ReadOnly(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowColumn {
    Preference,
    Score,
    Domain,
    Meaning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryField {
    CoreDriver,
    Personality,
    WorkStyle,
    LearningStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpaceColumn {
    Title,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LessAlignedColumn {
    Area,
    Reason,
}

/// Location of an editable field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditPath {
    TestRow {
        test_key: String,
        row: usize,
        column: RowColumn,
    },
    /// Insight text without its marker.
    Insight { index: usize },
    Summary { field: SummaryField },
    CareerTitle { field_key: String },
    CareerAlignment { field_key: String },
    CareerDescription { field_key: String },
    CareerSpace {
        field_key: String,
        index: usize,
        column: SpaceColumn,
    },
    LessAligned {
        field_key: String,
        index: usize,
        column: LessAlignedColumn,
    },
}

impl EditPath {
    pub fn targets_report(&self) -> bool {
        matches!(self, EditPath::TestRow { .. } | EditPath::Insight { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldEdit {
    pub path: EditPath,
    pub value: String,
}

/// Applies an edit addressed to the report.
pub fn apply_report_edit(report: &mut ReportData, edit: &FieldEdit) -> Result<(), EditError> {
    match &edit.path {
        EditPath::TestRow {
            test_key,
            row,
            column,
        } => {
            let kind = TestKind::from_key(test_key);
            let rows = report
                .test_data
                .get_mut(test_key.as_str())
                .ok_or_else(|| EditError::UnknownPath(format!("testData.{test_key}")))?;
            let target = rows
                .get_mut(*row)
                .ok_or_else(|| EditError::UnknownPath(format!("testData.{test_key}[{row}]")))?;
            let path = format!("testData.{test_key}[{row}].{column:?}");

            match (kind, column) {
                (Some(TestKind::Personality16), RowColumn::Preference) => {
                    Err(EditError::ReadOnly(path))
                }
                (_, RowColumn::Preference) => {
                    target.preference = edit.value.clone();
                    Ok(())
                }
                (_, RowColumn::Meaning) => {
                    target.meaning = edit.value.clone();
                    Ok(())
                }
                (Some(TestKind::High5), RowColumn::Domain) => {
                    target.domain = Some(lenient::retype(target.domain.as_ref(), edit.value.clone()));
                    Ok(())
                }
                (Some(TestKind::High5), RowColumn::Score) | (_, RowColumn::Domain) => {
                    Err(EditError::UnknownPath(path))
                }
                (_, RowColumn::Score) => {
                    target.score = Some(lenient::retype(target.score.as_ref(), edit.value.clone()));
                    Ok(())
                }
            }
        }
        EditPath::Insight { index } => {
            let line = report
                .insight_lines
                .get_mut(*index)
                .ok_or_else(|| EditError::UnknownPath(format!("insightLines[{index}]")))?;
            *line = with_insight_prefix(&edit.value);
            Ok(())
        }
        other => Err(EditError::UnknownPath(format!("{other:?}"))),
    }
}

/// Applies an edit addressed to the career analysis.
pub fn apply_career_edit(career: &mut CareerData, edit: &FieldEdit) -> Result<(), EditError> {
    let value = edit.value.clone();
    match &edit.path {
        EditPath::Summary { field } => {
            let summary = career
                .summary
                .as_mut()
                .ok_or_else(|| EditError::UnknownPath("summary".to_string()))?;
            let slot = match field {
                SummaryField::CoreDriver => &mut summary.core_driver,
                SummaryField::Personality => &mut summary.personality,
                SummaryField::WorkStyle => &mut summary.work_style,
                SummaryField::LearningStyle => &mut summary.learning_style,
            };
            *slot = value;
        }
        EditPath::CareerTitle { field_key } => {
            career_field(career, field_key)?.title = value;
        }
        EditPath::CareerDescription { field_key } => {
            career_field(career, field_key)?.description = value;
        }
        EditPath::CareerAlignment { field_key } => {
            let alignment = Alignment::from(value);
            if !Alignment::EDITABLE.contains(&alignment) {
                return Err(EditError::InvalidValue(format!(
                    "alignment must be High, Moderate or Low, got '{alignment}'"
                )));
            }
            career_field(career, field_key)?.alignment = alignment;
        }
        EditPath::CareerSpace {
            field_key,
            index,
            column,
        } => {
            let space = career_field(career, field_key)?
                .spaces
                .get_mut(*index)
                .ok_or_else(|| {
                    EditError::UnknownPath(format!("careerFields.{field_key}.spaces[{index}]"))
                })?;
            match column {
                SpaceColumn::Title => space.title = value,
                SpaceColumn::Description => space.description = value,
            }
        }
        EditPath::LessAligned {
            field_key,
            index,
            column,
        } => {
            let item = career_field(career, field_key)?
                .less_aligned
                .get_mut(*index)
                .ok_or_else(|| {
                    EditError::UnknownPath(format!(
                        "careerFields.{field_key}.lessAligned[{index}]"
                    ))
                })?;
            match column {
                LessAlignedColumn::Area => item.area = value,
                LessAlignedColumn::Reason => item.reason = value,
            }
        }
        other => return Err(EditError::UnknownPath(format!("{other:?}"))),
    }
    Ok(())
}

fn career_field<'a>(
    career: &'a mut CareerData,
    field_key: &str,
) -> Result<&'a mut crate::models::CareerField, EditError> {
    career
        .career_fields
        .get_mut(field_key)
        .ok_or_else(|| EditError::UnknownPath(format!("careerFields.{field_key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> ReportData {
        serde_json::from_value(json!({
            "studentInfo": {"name": "Asha", "age": 12, "grade": "7th"},
            "testData": {
                "test16PersonalityData": [{"preference": "E", "score": "62%", "meaning": "Outgoing"}],
                "high5Data": [{"preference": "Coach", "domain": "Relationship", "meaning": "Helps"}],
                "riasecData": [{"preference": "Social", "score": "40", "meaning": "Helping"}]
            },
            "insightLines": ["INSIGHT: foo", "INSIGHT: bar"]
        }))
        .unwrap()
    }

    fn career() -> CareerData {
        serde_json::from_value(json!({
            "summary": {"coreDriver": "Curiosity", "personality": "Warm", "workStyle": "Team", "learningStyle": "Visual"},
            "careerFields": {
                "health": {
                    "title": "Healthcare",
                    "alignment": "High",
                    "description": "Care for others",
                    "spaces": [{"title": "Nursing", "description": "Patient care"}],
                    "lessAligned": [{"area": "Surgery", "reason": "High pressure"}]
                }
            }
        }))
        .unwrap()
    }

    fn row_edit(test_key: &str, row: usize, column: RowColumn, value: &str) -> FieldEdit {
        FieldEdit {
            path: EditPath::TestRow {
                test_key: test_key.to_string(),
                row,
                column,
            },
            value: value.to_string(),
        }
    }

    #[test]
    fn test_edit_score_in_place() {
        let mut report = report();
        apply_report_edit(
            &mut report,
            &row_edit("test16PersonalityData", 0, RowColumn::Score, "70%"),
        )
        .unwrap();
        assert_eq!(
            report.test_data["test16PersonalityData"][0].score_text().as_deref(),
            Some("70%")
        );
    }

    #[test]
    fn test_numeric_score_edit_stays_numeric() {
        let mut report = report();
        report.test_data["riasecData"][0].score = Some(json!(40));

        apply_report_edit(&mut report, &row_edit("riasecData", 0, RowColumn::Score, "45"))
            .unwrap();

        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["testData"]["riasecData"][0]["score"], json!(45));
    }

    #[test]
    fn test_personality_preference_is_read_only() {
        let mut report = report();
        let err = apply_report_edit(
            &mut report,
            &row_edit("test16PersonalityData", 0, RowColumn::Preference, "I"),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::ReadOnly(_)));
        assert_eq!(report.test_data["test16PersonalityData"][0].preference, "E");
    }

    #[test]
    fn test_high5_edits_domain_but_not_score() {
        let mut report = report();
        apply_report_edit(&mut report, &row_edit("high5Data", 0, RowColumn::Domain, "Thinking"))
            .unwrap();
        assert_eq!(
            report.test_data["high5Data"][0].domain_text().as_deref(),
            Some("Thinking")
        );

        let err = apply_report_edit(&mut report, &row_edit("high5Data", 0, RowColumn::Score, "1"))
            .unwrap_err();
        assert!(matches!(err, EditError::UnknownPath(_)));
        assert!(report.test_data["high5Data"][0].score.is_none());
    }

    #[test]
    fn test_scored_tests_reject_domain() {
        let mut report = report();
        let err = apply_report_edit(&mut report, &row_edit("riasecData", 0, RowColumn::Domain, "x"))
            .unwrap_err();
        assert!(matches!(err, EditError::UnknownPath(_)));
    }

    #[test]
    fn test_row_index_out_of_range_is_rejected() {
        let mut report = report();
        let err = apply_report_edit(&mut report, &row_edit("riasecData", 5, RowColumn::Meaning, "x"))
            .unwrap_err();
        assert_eq!(
            err,
            EditError::UnknownPath("testData.riasecData[5]".to_string())
        );
        assert_eq!(report.test_data["riasecData"].len(), 1);
    }

    #[test]
    fn test_insight_edit_reapplies_prefix() {
        let mut report = report();
        let edit = FieldEdit {
            path: EditPath::Insight { index: 1 },
            value: "rewritten".to_string(),
        };
        apply_report_edit(&mut report, &edit).unwrap();
        assert_eq!(report.insight_lines[1], "INSIGHT: rewritten");

        let empty = FieldEdit {
            path: EditPath::Insight { index: 0 },
            value: String::new(),
        };
        apply_report_edit(&mut report, &empty).unwrap();
        assert_eq!(report.insight_lines[0], "INSIGHT: ");
    }

    #[test]
    fn test_career_paths_edit_nested_fields() {
        let mut career = career();
        let edits = [
            (EditPath::Summary { field: SummaryField::WorkStyle }, "Solo"),
            (EditPath::CareerTitle { field_key: "health".into() }, "Health Sciences"),
            (EditPath::CareerAlignment { field_key: "health".into() }, "moderate"),
            (
                EditPath::CareerSpace {
                    field_key: "health".into(),
                    index: 0,
                    column: SpaceColumn::Description,
                },
                "Ward care",
            ),
            (
                EditPath::LessAligned {
                    field_key: "health".into(),
                    index: 0,
                    column: LessAlignedColumn::Area,
                },
                "Emergency medicine",
            ),
        ];
        for (path, value) in edits {
            apply_career_edit(
                &mut career,
                &FieldEdit {
                    path,
                    value: value.to_string(),
                },
            )
            .unwrap();
        }

        let field = &career.career_fields["health"];
        assert_eq!(career.summary.as_ref().unwrap().work_style, "Solo");
        assert_eq!(field.title, "Health Sciences");
        assert_eq!(field.alignment, Alignment::Moderate);
        assert_eq!(field.spaces[0].description, "Ward care");
        assert_eq!(field.less_aligned[0].area, "Emergency medicine");
    }

    #[test]
    fn test_alignment_outside_tiers_is_rejected() {
        let mut career = career();
        let err = apply_career_edit(
            &mut career,
            &FieldEdit {
                path: EditPath::CareerAlignment {
                    field_key: "health".into(),
                },
                value: "Excellent".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidValue(_)));
        assert_eq!(career.career_fields["health"].alignment, Alignment::High);
    }

    #[test]
    fn test_unknown_career_field_key() {
        let mut career = career();
        let err = apply_career_edit(
            &mut career,
            &FieldEdit {
                path: EditPath::CareerTitle {
                    field_key: "law".into(),
                },
                value: "Law".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err, EditError::UnknownPath("careerFields.law".to_string()));
    }

    #[test]
    fn test_edit_path_wire_format() {
        let edit: FieldEdit = serde_json::from_value(json!({
            "path": {"kind": "testRow", "testKey": "bigFiveData", "row": 2, "column": "score"},
            "value": "55"
        }))
        .unwrap();
        assert_eq!(
            edit.path,
            EditPath::TestRow {
                test_key: "bigFiveData".to_string(),
                row: 2,
                column: RowColumn::Score,
            }
        );
        assert!(edit.path.targets_report());

        let edit: FieldEdit = serde_json::from_value(json!({
            "path": {"kind": "lessAligned", "fieldKey": "stem", "index": 0, "column": "reason"},
            "value": "Too abstract"
        }))
        .unwrap();
        assert!(!edit.path.targets_report());
    }
}
