use crate::GridError;
use omr_core::{CellRect, OPTION_COUNT};
use serde::{Deserialize, Serialize};

fn default_columns() -> u32 {
    1
}

/// Logical answer grid: `questions` rows of five options (A-E), laid out in
/// one or two side-by-side column blocks, numbered down the left block first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub questions: u32,
    #[serde(default = "default_columns")]
    pub columns: u32,
    #[serde(default)]
    pub grid: GridStrategy,
}

impl LayoutSpec {
    pub fn fixed(questions: u32, columns: u32, params: FixedGridParams) -> Self {
        Self {
            questions,
            columns,
            grid: GridStrategy::Fixed(params),
        }
    }

    pub fn detected(questions: u32, columns: u32, params: DetectedGridParams) -> Self {
        Self {
            questions,
            columns,
            grid: GridStrategy::Detected(params),
        }
    }

    pub fn options(&self) -> usize {
        OPTION_COUNT
    }

    /// Questions per column block; the left block takes the extra one when
    /// the count is odd.
    pub fn rows_per_column(&self) -> u32 {
        self.questions.div_ceil(self.columns.max(1))
    }

    pub fn validate(&self) -> Result<(), GridError> {
        if self.questions == 0 {
            return Err(GridError::InvalidLayout("question count must be >= 1".into()));
        }
        if !(1..=2).contains(&self.columns) {
            return Err(GridError::InvalidLayout(format!(
                "column count must be 1 or 2, got {}",
                self.columns
            )));
        }
        match &self.grid {
            GridStrategy::Fixed(p) => p.validate(),
            GridStrategy::Detected(p) => p.validate(),
        }
    }
}

/// Grid location strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GridStrategy {
    Fixed(FixedGridParams),
    Detected(DetectedGridParams),
}

impl Default for GridStrategy {
    fn default() -> Self {
        Self::Fixed(FixedGridParams::default())
    }
}

/// Analytic grid parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedGridParams {
    pub placement: Placement,
    /// Fraction trimmed from every side of a cell before scoring
    /// (`0.25` scores the middle half in both axes).
    pub cell_inset: f32,
}

impl Default for FixedGridParams {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            cell_inset: 0.25,
        }
    }
}

impl FixedGridParams {
    fn validate(&self) -> Result<(), GridError> {
        if !(0.0..0.5).contains(&self.cell_inset) {
            return Err(GridError::InvalidLayout(format!(
                "cell_inset must be in [0, 0.5), got {}",
                self.cell_inset
            )));
        }
        match &self.placement {
            Placement::Relative(r) => {
                let ok = (0.0..1.0).contains(&r.header_frac)
                    && (0.0..1.0).contains(&r.label_frac)
                    && (0.0..1.0).contains(&r.footer_frac)
                    && r.header_frac + r.footer_frac < 1.0;
                if !ok {
                    return Err(GridError::InvalidLayout(
                        "relative placement fractions must leave a non-empty answer area".into(),
                    ));
                }
            }
            Placement::Absolute(a) => {
                if a.cell_w <= 0.0 || a.cell_h <= 0.0 {
                    return Err(GridError::InvalidLayout("cell size must be > 0".into()));
                }
            }
            Placement::Explicit(_) => {}
        }
        Ok(())
    }
}

/// Where the fixed grid sits in the rectified frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Fractions of the sheet; adapts to any rectified size.
    Relative(RelativePlacement),
    /// Pixel offsets and pitches in the rectified frame.
    Absolute(AbsolutePlacement),
    /// Every option rectangle listed explicitly, question 1 first.
    Explicit(ExplicitPlacement),
}

impl Default for Placement {
    fn default() -> Self {
        Self::Relative(RelativePlacement::default())
    }
}

/// Each column block spans `width / columns`; the header band and the
/// question-number strip on the left of each block are skipped and the rest
/// is divided evenly into rows and five option cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelativePlacement {
    pub header_frac: f32,
    /// Left part of each block holding question numbers.
    pub label_frac: f32,
    pub footer_frac: f32,
}

impl Default for RelativePlacement {
    fn default() -> Self {
        Self {
            header_frac: 0.2,
            label_frac: 0.3,
            footer_frac: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsolutePlacement {
    /// Top-left of option A of the first question.
    pub origin_x: f32,
    pub origin_y: f32,
    /// Vertical distance between consecutive questions.
    pub row_pitch: f32,
    /// Horizontal distance between consecutive options.
    pub option_pitch: f32,
    pub cell_w: f32,
    pub cell_h: f32,
    /// Horizontal offset of the second column block.
    pub block_offset: f32,
}

impl Default for AbsolutePlacement {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            row_pitch: 30.0,
            option_pitch: 30.0,
            cell_w: 24.0,
            cell_h: 24.0,
            block_offset: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplicitPlacement {
    pub cells: Vec<[CellRect; OPTION_COUNT]>,
}

/// Circle detection and row clustering parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedGridParams {
    /// Median denoise radius; `0` disables.
    pub median_radius: u32,
    /// Gaussian smoothing before gradients; `0` disables.
    pub blur_sigma: f32,
    pub equalize: bool,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Gradient magnitude threshold as a fraction of the maximum.
    pub grad_threshold: f32,
    /// Accumulator peaks below this fraction of the strongest are ignored.
    pub min_vote_frac: f32,
    pub accum_sigma: f32,
    /// Fraction of boundary samples that must see a dark-to-bright edge.
    pub min_edge_support: f32,
    /// Detections closer than this are collapsed to the strongest one.
    pub dedup_distance: f32,
    /// Vertical band around a row's first detection.
    pub row_tolerance: f32,
    /// Rows with at least this many detections set the row pitch; sparser
    /// rows are numbered only when they sit on that pitch.
    pub min_row_detections: usize,
    pub max_candidates: Option<usize>,
}

impl Default for DetectedGridParams {
    fn default() -> Self {
        Self {
            median_radius: 1,
            blur_sigma: 1.0,
            equalize: true,
            min_radius: 6.0,
            max_radius: 18.0,
            grad_threshold: 0.1,
            min_vote_frac: 0.2,
            accum_sigma: 1.5,
            min_edge_support: 0.6,
            dedup_distance: 10.0,
            row_tolerance: 20.0,
            min_row_detections: 3,
            max_candidates: None,
        }
    }
}

impl DetectedGridParams {
    fn validate(&self) -> Result<(), GridError> {
        if !(self.min_radius > 0.0 && self.max_radius >= self.min_radius) {
            return Err(GridError::InvalidLayout(format!(
                "radius range {}..={} is empty",
                self.min_radius, self.max_radius
            )));
        }
        if self.row_tolerance <= 0.0 {
            return Err(GridError::InvalidLayout("row_tolerance must be > 0".into()));
        }
        Ok(())
    }
}
