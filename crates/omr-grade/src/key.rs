use omr_core::OptionLetter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One problem found while validating a raw answer key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum KeyIssue {
    NonNumeric { key: String },
    /// Numeric but not plain decimal, e.g. `"01"`, `"+2"` or `" 3"`.
    NonCanonical { key: String },
    OutOfRange { key: String },
    Missing { question: u32 },
    InvalidLetter { question: u32, value: String },
}

impl fmt::Display for KeyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyIssue::NonNumeric { key } => write!(f, "key {key:?} is not a question number"),
            KeyIssue::NonCanonical { key } => {
                write!(f, "key {key:?} must be written as a plain question number")
            }
            KeyIssue::OutOfRange { key } => write!(f, "question number {key:?} must be >= 1"),
            KeyIssue::Missing { question } => write!(f, "question {question} is missing"),
            KeyIssue::InvalidLetter { question, value } => write!(
                f,
                "question {question}: answer {value:?} is invalid; use A, B, C, D or E"
            ),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnswerKeyError {
    #[error("answer key is empty")]
    Empty,
    #[error("invalid answer key: {}", join_issues(.0))]
    Invalid(Vec<KeyIssue>),
}

fn join_issues(issues: &[KeyIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validated answer key: questions `1..=len()` with no gaps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct AnswerKey {
    answers: BTreeMap<u32, OptionLetter>,
}

impl AnswerKey {
    /// Validate a key given as question-number strings to letters.
    ///
    /// Every issue is collected: non-numeric keys, numbers below 1, numbers
    /// not spelled as plain decimals, gaps in `1..=max` and values other than
    /// the uppercase letters A-E. The question count is the largest key.
    pub fn from_raw(raw: &BTreeMap<String, String>) -> Result<Self, AnswerKeyError> {
        if raw.is_empty() {
            return Err(AnswerKeyError::Empty);
        }

        let mut issues = Vec::new();
        let mut numbered: BTreeMap<u32, &str> = BTreeMap::new();
        for (key, value) in raw {
            match key.trim().parse::<i64>() {
                Ok(n) if !(1..=u32::MAX as i64).contains(&n) => {
                    issues.push(KeyIssue::OutOfRange { key: key.clone() })
                }
                // Only the canonical spelling counts, so two keys never
                // name the same question.
                Ok(n) if n.to_string() != *key => {
                    issues.push(KeyIssue::NonCanonical { key: key.clone() })
                }
                Ok(n) => {
                    numbered.insert(n as u32, value.as_str());
                }
                Err(_) => issues.push(KeyIssue::NonNumeric { key: key.clone() }),
            }
        }

        let Some(&max) = numbered.keys().next_back() else {
            return Err(AnswerKeyError::Invalid(issues));
        };

        let mut answers = BTreeMap::new();
        for q in 1..=max {
            match numbered.get(&q) {
                None => issues.push(KeyIssue::Missing { question: q }),
                Some(value) => match parse_key_letter(value) {
                    Some(letter) => {
                        answers.insert(q, letter);
                    }
                    None => issues.push(KeyIssue::InvalidLetter {
                        question: q,
                        value: value.to_string(),
                    }),
                },
            }
        }

        if issues.is_empty() {
            Ok(Self { answers })
        } else {
            Err(AnswerKeyError::Invalid(issues))
        }
    }

    /// Build from already parsed answers; numbering must still be `1..=n`.
    pub fn new(answers: BTreeMap<u32, OptionLetter>) -> Result<Self, AnswerKeyError> {
        let raw = answers
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect();
        Self::from_raw(&raw)
    }

    /// Number of questions.
    pub fn len(&self) -> u32 {
        self.answers.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn get(&self, question: u32) -> Option<OptionLetter> {
        self.answers.get(&question).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, OptionLetter)> + '_ {
        self.answers.iter().map(|(q, a)| (*q, *a))
    }
}

fn parse_key_letter(value: &str) -> Option<OptionLetter> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => OptionLetter::from_char(c),
        _ => None,
    }
}

impl TryFrom<BTreeMap<String, String>> for AnswerKey {
    type Error = AnswerKeyError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_raw(&raw)
    }
}

impl From<AnswerKey> for BTreeMap<String, String> {
    fn from(key: AnswerKey) -> Self {
        key.answers
            .into_iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect()
    }
}
