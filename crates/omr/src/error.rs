use crate::grade::AnswerKeyError;
use crate::grid::GridError;
use crate::rectify::NormalizeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stable classification of a failure, for reports and exit handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoSheetDetected,
    GridUnresolved,
    InvalidAnswerKey,
    RegionScoreFailure,
    InvalidConfig,
    Io,
    Image,
}

/// Errors produced by the grading facade.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    AnswerKey(#[from] AnswerKeyError),

    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("template rectification requested but no template image was provided")]
    MissingTemplate,

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl GradeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GradeError::Normalize(NormalizeError::InvalidImage { .. }) => ErrorKind::Image,
            GradeError::Normalize(_) => ErrorKind::NoSheetDetected,
            GradeError::Grid(GridError::GridUnresolved { .. }) => ErrorKind::GridUnresolved,
            GradeError::Grid(GridError::InvalidLayout(_)) => ErrorKind::InvalidConfig,
            GradeError::AnswerKey(_) => ErrorKind::InvalidAnswerKey,
            GradeError::InvalidGrayBuffer { .. } => ErrorKind::Image,
            GradeError::MissingTemplate | GradeError::Json { .. } => ErrorKind::InvalidConfig,
            GradeError::Io { .. } => ErrorKind::Io,
            GradeError::Image { .. } => ErrorKind::Image,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GradeError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        GradeError::Image {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        GradeError::Json {
            path: path.into(),
            source,
        }
    }
}

/// A structured failure or degradation attached to a sheet result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetIssue {
    pub kind: ErrorKind,
    pub message: String,
}

impl SheetIssue {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&GradeError> for SheetIssue {
    fn from(err: &GradeError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}
