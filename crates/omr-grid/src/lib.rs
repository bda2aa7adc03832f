//! Where the bubbles are and how full they are.
//!
//! A [`LayoutSpec`] selects one of two strategies: a fixed grid computed
//! from layout parameters, or a grid assembled from detected circular marks.
//! Both yield a [`RegionGrid`] in the rectified frame, which [`FillScorer`]
//! turns into a [`ScoreMatrix`].

mod detected;
mod error;
mod fixed;
mod layout;
mod locator;
mod region;
mod score;

pub use detected::{
    assemble_rows, dedup_circles, find_circles, split_columns, DetectedCircle, RowAssembly,
    RowOutcome, RowRecord,
};
pub use error::{GridError, RegionScoreError};
pub use fixed::fixed_grid;
pub use layout::{
    AbsolutePlacement, DetectedGridParams, ExplicitPlacement, FixedGridParams, GridStrategy,
    LayoutSpec, Placement, RelativePlacement,
};
pub use locator::{GridLocator, RegionLocator};
pub use region::{DroppedRow, Region, RegionGrid, RegionShape};
pub use score::{FillScoreParams, FillScorer, OptionScores, RegionFailure, ScoreMatrix, ScoreMode};
