//! Per-sheet statistics derived from a [`GradingResult`].

use crate::grading::{ratio, round2};
use crate::{AnswerKey, Decision, GradingResult, QuestionStatus};
use omr_core::{OptionLetter, OPTION_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub correct: u32,
    pub incorrect: u32,
    pub blank: u32,
    pub multiple: u32,
    pub undetected: u32,
}

impl StatusCounts {
    fn get(&self, status: QuestionStatus) -> u32 {
        match status {
            QuestionStatus::Correct => self.correct,
            QuestionStatus::Incorrect => self.incorrect,
            QuestionStatus::Blank => self.blank,
            QuestionStatus::Multiple => self.multiple,
            QuestionStatus::Undetected => self.undetected,
        }
    }
}

/// Share of the total per status, in percent with two decimals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPercentages {
    pub correct: f64,
    pub incorrect: f64,
    pub blank: f64,
    pub multiple: f64,
    pub undetected: f64,
}

/// Question numbers grouped by status, ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLists {
    pub correct: Vec<u32>,
    pub incorrect: Vec<u32>,
    pub blank: Vec<u32>,
    pub multiple: Vec<u32>,
    pub undetected: Vec<u32>,
}

/// How often each letter was chosen by the student and used by the key,
/// counted over single-answer questions only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDistribution {
    pub chosen: [u32; OPTION_COUNT],
    pub expected: [u32; OPTION_COUNT],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryFlag {
    /// Less than 90% of the questions were detected; check image quality.
    LowDetectionRate,
    /// More than five questions carry multiple marks.
    ManyMultipleMarks,
    /// More than ten questions were left blank.
    ManyBlank,
    /// Under 30% correct.
    LowScore,
    /// Over 90% correct.
    Excellent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradingReport {
    pub counts: StatusCounts,
    pub percentages: StatusPercentages,
    /// `correct / (correct + incorrect)` in percent.
    pub attempt_accuracy: f64,
    /// `(total - undetected) / total` in percent.
    pub detection_rate: f64,
    /// Blank, multiple and undetected questions.
    pub problematic: u32,
    pub categories: CategoryLists,
    pub distribution: OptionDistribution,
    pub flags: Vec<AdvisoryFlag>,
}

impl GradingReport {
    pub fn from_result(result: &GradingResult, key: &AnswerKey) -> Self {
        let counts = StatusCounts {
            correct: result.count(QuestionStatus::Correct),
            incorrect: result.count(QuestionStatus::Incorrect),
            blank: result.count(QuestionStatus::Blank),
            multiple: result.count(QuestionStatus::Multiple),
            undetected: result.count(QuestionStatus::Undetected),
        };
        let pct = |s: QuestionStatus| round2(ratio(counts.get(s), result.total) * 100.0);
        let percentages = StatusPercentages {
            correct: pct(QuestionStatus::Correct),
            incorrect: pct(QuestionStatus::Incorrect),
            blank: pct(QuestionStatus::Blank),
            multiple: pct(QuestionStatus::Multiple),
            undetected: pct(QuestionStatus::Undetected),
        };

        let categories = CategoryLists {
            correct: result.questions_with(QuestionStatus::Correct),
            incorrect: result.questions_with(QuestionStatus::Incorrect),
            blank: result.questions_with(QuestionStatus::Blank),
            multiple: result.questions_with(QuestionStatus::Multiple),
            undetected: result.questions_with(QuestionStatus::Undetected),
        };

        let mut distribution = OptionDistribution::default();
        for (q, detail) in &result.details {
            if let Some(Decision::Single(chosen)) = detail.detected {
                distribution.chosen[chosen.index()] += 1;
                if let Some(expected) = key.get(*q) {
                    distribution.expected[expected.index()] += 1;
                }
            }
        }

        let detection_rate = round2(
            ratio(result.total.saturating_sub(counts.undetected), result.total) * 100.0,
        );
        let mut flags = Vec::new();
        if detection_rate < 90.0 {
            flags.push(AdvisoryFlag::LowDetectionRate);
        }
        if counts.multiple > 5 {
            flags.push(AdvisoryFlag::ManyMultipleMarks);
        }
        if counts.blank > 10 {
            flags.push(AdvisoryFlag::ManyBlank);
        }
        if percentages.correct < 30.0 {
            flags.push(AdvisoryFlag::LowScore);
        } else if percentages.correct > 90.0 {
            flags.push(AdvisoryFlag::Excellent);
        }

        Self {
            counts,
            percentages,
            attempt_accuracy: round2(
                ratio(counts.correct, counts.correct + counts.incorrect) * 100.0,
            ),
            detection_rate,
            problematic: counts.blank + counts.multiple + counts.undetected,
            categories,
            distribution,
            flags,
        }
    }

    pub fn chosen_count(&self, option: OptionLetter) -> u32 {
        self.distribution.chosen[option.index()]
    }
}
