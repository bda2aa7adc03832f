use crate::grade::{Decision, GradingReport, GradingResult};
use crate::grid::{DroppedRow, GridStrategy, LayoutSpec};
use crate::rectify::RectifyMode;
use crate::{GradeError, SheetIssue, SheetOutcome};
use omr_core::{OptionLetter, OPTION_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    Fixed,
    Detected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub questions: u32,
    pub columns: u32,
    pub grid: GridKind,
}

impl From<&LayoutSpec> for LayoutSummary {
    fn from(layout: &LayoutSpec) -> Self {
        Self {
            questions: layout.questions,
            columns: layout.columns,
            grid: match layout.grid {
                GridStrategy::Fixed(_) => GridKind::Fixed,
                GridStrategy::Detected(_) => GridKind::Detected,
            },
        }
    }
}

/// Raw scores of one question, with the decision drawn from them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionScores {
    pub scores: [f32; OPTION_COUNT],
    pub decision: Decision,
    pub best_guess: OptionLetter,
}

/// JSON report of one processed sheet.
///
/// On failure only the identification fields and `error` are set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetReport {
    pub image_path: String,
    pub layout: LayoutSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectify_mode: Option<RectifyMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_size: Option<(usize, usize)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GradingResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<GradingReport>,
    #[serde(default)]
    pub questions: BTreeMap<u32, QuestionScores>,
    #[serde(default)]
    pub dropped_rows: Vec<DroppedRow>,
    #[serde(default)]
    pub issues: Vec<SheetIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SheetIssue>,
}

impl SheetReport {
    pub fn from_outcome(image_path: &str, layout: &LayoutSpec, outcome: &SheetOutcome) -> Self {
        let questions = outcome
            .scores
            .scores
            .iter()
            .filter_map(|(q, s)| {
                let entry = QuestionScores {
                    scores: s.0,
                    decision: outcome.decisions.get(q)?.clone(),
                    best_guess: *outcome.best_guesses.get(q)?,
                };
                Some((*q, entry))
            })
            .collect();

        Self {
            image_path: image_path.to_string(),
            layout: layout.into(),
            rectify_mode: Some(outcome.sheet.mode),
            sheet_size: Some((outcome.sheet.image.width, outcome.sheet.image.height)),
            threshold: Some(outcome.threshold),
            result: Some(outcome.result.clone()),
            report: Some(outcome.report.clone()),
            questions,
            dropped_rows: outcome.grid.dropped_rows.clone(),
            issues: outcome.issues.clone(),
            error: None,
        }
    }

    pub fn failed(image_path: &str, layout: &LayoutSpec, err: &GradeError) -> Self {
        Self {
            image_path: image_path.to_string(),
            layout: layout.into(),
            rectify_mode: None,
            sheet_size: None,
            threshold: None,
            result: None,
            report: None,
            questions: BTreeMap::new(),
            dropped_rows: Vec::new(),
            issues: Vec::new(),
            error: Some(err.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
