use omr_core::{CellRect, Circle, OPTION_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scoring window of one option.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RegionShape {
    /// Every pixel of `Region::rect`.
    Window,
    /// Circular mask inscribed in `Region::rect`.
    Disk(Circle),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub rect: CellRect,
    pub shape: RegionShape,
}

impl Region {
    pub fn window(rect: CellRect) -> Self {
        Self {
            rect,
            shape: RegionShape::Window,
        }
    }

    pub fn disk(circle: Circle) -> Self {
        Self {
            rect: circle.bounds(),
            shape: RegionShape::Disk(circle),
        }
    }
}

/// Detected row that could not be mapped to five options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DroppedRow {
    /// Question number the row consumed, if it was within the layout.
    pub question: Option<u32>,
    pub column: usize,
    pub y: f32,
    pub detections: usize,
}

/// Option regions per question (1-based), options in A-E order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionGrid {
    pub questions: BTreeMap<u32, [Region; OPTION_COUNT]>,
    /// x of the boundary between column blocks, when there are two.
    pub column_divider: Option<f32>,
    pub dropped_rows: Vec<DroppedRow>,
}

impl RegionGrid {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, question: u32) -> Option<&[Region; OPTION_COUNT]> {
        self.questions.get(&question)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Region; OPTION_COUNT])> {
        self.questions.iter().map(|(q, r)| (*q, r))
    }
}
