use crate::{AnswerKey, Decision};
use log::info;
use omr_core::OptionLetter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Correct,
    Incorrect,
    Blank,
    Multiple,
    /// No decision exists for a question the key asks about.
    Undetected,
}

impl QuestionStatus {
    pub const ALL: [QuestionStatus; 5] = [
        QuestionStatus::Correct,
        QuestionStatus::Incorrect,
        QuestionStatus::Blank,
        QuestionStatus::Multiple,
        QuestionStatus::Undetected,
    ];

    fn classify(decision: Option<&Decision>, expected: OptionLetter) -> Self {
        match decision {
            None => QuestionStatus::Undetected,
            Some(Decision::Blank) => QuestionStatus::Blank,
            Some(Decision::Multiple(_)) => QuestionStatus::Multiple,
            Some(Decision::Single(o)) if *o == expected => QuestionStatus::Correct,
            Some(Decision::Single(_)) => QuestionStatus::Incorrect,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub status: QuestionStatus,
    /// `None` when the question was never detected.
    pub detected: Option<Decision>,
    pub expected: OptionLetter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub total: u32,
    pub correct: u32,
    /// Every status other than `Correct`.
    pub errors: u32,
    /// `correct / total * 100`, two decimals.
    pub percentage: f64,
    /// `correct / total * 10`, two decimals.
    pub grade: f64,
    pub details: BTreeMap<u32, QuestionDetail>,
}

impl GradingResult {
    pub fn count(&self, status: QuestionStatus) -> u32 {
        self.details.values().filter(|d| d.status == status).count() as u32
    }

    /// Questions with the given status, ascending.
    pub fn questions_with(&self, status: QuestionStatus) -> Vec<u32> {
        self.details
            .iter()
            .filter(|(_, d)| d.status == status)
            .map(|(q, _)| *q)
            .collect()
    }

    /// Verify the tallies agree with each other and with the detail map.
    pub fn check_consistency(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        if self.correct + self.errors != self.total {
            problems.push(format!(
                "correct ({}) + errors ({}) != total ({})",
                self.correct, self.errors, self.total
            ));
        }
        if self.details.len() != self.total as usize {
            problems.push(format!(
                "{} question details for {} questions",
                self.details.len(),
                self.total
            ));
        }
        let correct = self.count(QuestionStatus::Correct);
        if correct != self.correct {
            problems.push(format!(
                "{correct} questions marked correct but tally says {}",
                self.correct
            ));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub(crate) fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Grade decisions against a validated key.
///
/// Every key question gets a detail; decisions for questions outside the
/// key are ignored.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "info", skip_all, fields(total = key.len()))
)]
pub fn grade(decisions: &BTreeMap<u32, Decision>, key: &AnswerKey) -> GradingResult {
    let details: BTreeMap<u32, QuestionDetail> = key
        .iter()
        .map(|(q, expected)| {
            let detected = decisions.get(&q);
            let detail = QuestionDetail {
                status: QuestionStatus::classify(detected, expected),
                detected: detected.cloned(),
                expected,
            };
            (q, detail)
        })
        .collect();

    let total = key.len();
    let correct = details
        .values()
        .filter(|d| d.status == QuestionStatus::Correct)
        .count() as u32;
    let share = ratio(correct, total);
    let result = GradingResult {
        total,
        correct,
        errors: total - correct,
        percentage: round2(share * 100.0),
        grade: round2(share * 10.0),
        details,
    };
    info!(
        "graded {} questions: {} correct, grade {:.2}",
        result.total, result.correct, result.grade
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use OptionLetter::*;

    fn key(letters: &[OptionLetter]) -> AnswerKey {
        AnswerKey::new(
            letters
                .iter()
                .enumerate()
                .map(|(i, l)| (i as u32 + 1, *l))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn three_question_scenario() {
        let decisions = BTreeMap::from([
            (1, Decision::Single(A)),
            (2, Decision::Single(C)),
            (3, Decision::Blank),
        ]);
        let r = grade(&decisions, &key(&[A, B, C]));

        assert_eq!(r.details[&1].status, QuestionStatus::Correct);
        assert_eq!(r.details[&2].status, QuestionStatus::Incorrect);
        assert_eq!(r.details[&3].status, QuestionStatus::Blank);
        assert_eq!((r.total, r.correct, r.errors), (3, 1, 2));
        assert_relative_eq!(r.grade, 3.33);
        assert_relative_eq!(r.percentage, 33.33);
        assert_eq!(r.details[&2].expected, B);
        assert!(r.check_consistency().is_ok());
    }

    #[test]
    fn all_blank_sheet_scores_zero() {
        let decisions = (1..=5).map(|q| (q, Decision::Blank)).collect();
        let r = grade(&decisions, &key(&[A, B, C, D, E]));
        assert_eq!((r.correct, r.errors), (0, 5));
        assert_eq!(r.grade, 0.0);
    }

    #[test]
    fn missing_decisions_are_undetected() {
        let decisions = BTreeMap::from([
            (1, Decision::Multiple(vec![A, B])),
            (7, Decision::Single(A)),
        ]);
        let r = grade(&decisions, &key(&[A, B]));
        assert_eq!(r.details[&1].status, QuestionStatus::Multiple);
        assert_eq!(r.details[&2].status, QuestionStatus::Undetected);
        assert_eq!(r.details[&2].detected, None);
        assert!(!r.details.contains_key(&7));
        assert_eq!(r.errors, 2);
    }

    #[test]
    fn tallies_always_add_up() {
        let letters = [A, B, C, D, E, A, B, C, D, E, A];
        let k = key(&letters);
        for mask in 0u32..64 {
            let decisions: BTreeMap<u32, Decision> = (1..=11u32)
                .filter_map(|q| match (mask >> (q % 6)) & 1 {
                    0 if q % 3 == 0 => None,
                    0 => Some((q, Decision::Single(letters[(q as usize) % 11]))),
                    _ => Some((q, Decision::Single(letters[q as usize - 1]))),
                })
                .collect();
            let r = grade(&decisions, &k);
            assert_eq!(r.correct + r.errors, r.total);
            assert!(r.check_consistency().is_ok());
        }
    }

    #[test]
    fn tampered_result_fails_consistency() {
        let mut r = grade(&BTreeMap::new(), &key(&[A, B]));
        r.correct = 2;
        let problems = r.check_consistency().unwrap_err();
        assert_eq!(problems.len(), 2);
    }
}
