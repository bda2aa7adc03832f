use omr_core::OptionLetter;
use omr_grid::{OptionScores, ScoreMatrix, ScoreMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification of one question's marks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "options", rename_all = "snake_case")]
pub enum Decision {
    Blank,
    Single(OptionLetter),
    /// Two or more marked options, A-E order. A valid outcome, not an error.
    Multiple(Vec<OptionLetter>),
}

impl Decision {
    pub fn marked(&self) -> &[OptionLetter] {
        match self {
            Decision::Blank => &[],
            Decision::Single(o) => std::slice::from_ref(o),
            Decision::Multiple(v) => v,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionParams {
    /// An option is marked when its score is strictly above this.
    /// `None` uses the scoring mode's default (0.30 binarized, 0.40 mean).
    pub threshold: Option<f32>,
}

impl DecisionParams {
    pub fn threshold_for(&self, mode: ScoreMode) -> f32 {
        self.threshold.unwrap_or_else(|| mode.default_threshold())
    }
}

/// Threshold-gated decision: marked options are those scoring above
/// `threshold`.
pub fn decide(scores: &OptionScores, threshold: f32) -> Decision {
    let marked: Vec<OptionLetter> = scores
        .iter()
        .filter(|&(_, s)| s > threshold)
        .map(|(o, _)| o)
        .collect();
    match marked.as_slice() {
        [] => Decision::Blank,
        [one] => Decision::Single(*one),
        _ => Decision::Multiple(marked),
    }
}

/// Most filled option; ties go to the earlier letter.
pub fn best_guess(scores: &OptionScores) -> OptionLetter {
    let mut best = (OptionLetter::A, scores.get(OptionLetter::A));
    for (o, s) in scores.iter().skip(1) {
        if s > best.1 {
            best = (o, s);
        }
    }
    best.0
}

/// Decide every scored question. Unscored questions are absent.
pub fn decide_all(matrix: &ScoreMatrix, threshold: f32) -> BTreeMap<u32, Decision> {
    matrix
        .scores
        .iter()
        .map(|(q, s)| (*q, decide(s, threshold)))
        .collect()
}
