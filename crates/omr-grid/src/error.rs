#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("grid unresolved: {reason}")]
    GridUnresolved { reason: String },
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}

/// Per-region scoring failure; the affected question becomes undetected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionScoreError {
    #[error("region lies outside the image")]
    OutOfBounds,
    #[error("region has no pixels to score")]
    Degenerate,
}
