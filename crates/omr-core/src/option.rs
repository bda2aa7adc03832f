use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of answer options per question.
pub const OPTION_COUNT: usize = 5;

/// One of the five answer bubbles, left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
    E,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; OPTION_COUNT] = [Self::A, Self::B, Self::C, Self::D, Self::E];

    /// Zero-based column index (`A` = 0).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn as_char(self) -> char {
        (b'A' + self as u8) as char
    }

    /// Case-insensitive letter lookup.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            'E' => Some(Self::E),
            _ => None,
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid answer option {0:?}; expected one of A, B, C, D, E")]
pub struct ParseOptionError(pub String);

impl FromStr for OptionLetter {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c).ok_or_else(|| ParseOptionError(s.to_string())),
            _ => Err(ParseOptionError(s.to_string())),
        }
    }
}
