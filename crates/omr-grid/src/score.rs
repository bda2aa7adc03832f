//! Fill scoring of option regions.

use crate::{Region, RegionGrid, RegionScoreError, RegionShape};
use log::{debug, warn};
use omr_core::{otsu_threshold, Circle, GrayImageView, OptionLetter, OPTION_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a region's pixels become a score in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Fraction of pixels at or below the ink threshold.
    #[default]
    BinarizedRatio,
    /// `(threshold - mean) / threshold`, clamped: how far the mean intensity
    /// falls below the ink threshold.
    MeanIntensity,
}

impl ScoreMode {
    /// Suggested decision threshold for this mode.
    pub fn default_threshold(self) -> f32 {
        match self {
            ScoreMode::BinarizedRatio => 0.30,
            ScoreMode::MeanIntensity => 0.40,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillScoreParams {
    pub mode: ScoreMode,
    /// Fixed ink threshold; `None` selects one per image with Otsu.
    pub ink_threshold: Option<u8>,
    /// Upper bound on the automatic threshold; brighter pixels never count
    /// as ink.
    pub max_auto_threshold: u8,
    /// Disk masks keep `1 - disk_shrink` of the detected radius.
    pub disk_shrink: f32,
    /// Smallest share of a disk mask's bounds that must lie inside the
    /// image. Windows must lie fully inside.
    pub min_disk_coverage: f32,
}

impl Default for FillScoreParams {
    fn default() -> Self {
        Self {
            mode: ScoreMode::BinarizedRatio,
            ink_threshold: None,
            max_auto_threshold: 160,
            disk_shrink: 0.3,
            min_disk_coverage: 0.9,
        }
    }
}

/// Fill scores of the five options of one question, A first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionScores(pub [f32; OPTION_COUNT]);

impl OptionScores {
    pub fn get(&self, option: OptionLetter) -> f32 {
        self.0[option.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionLetter, f32)> + '_ {
        OptionLetter::ALL.iter().map(move |&o| (o, self.get(o)))
    }
}

/// A question that could not be scored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionFailure {
    pub question: u32,
    pub option: OptionLetter,
    pub error: String,
}

/// Scores per question; questions with a failed region are absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreMatrix {
    pub scores: BTreeMap<u32, OptionScores>,
    pub failures: Vec<RegionFailure>,
    pub ink_threshold: u8,
}

impl ScoreMatrix {
    pub fn get(&self, question: u32) -> Option<&OptionScores> {
        self.scores.get(&question)
    }
}

/// Scorer bound to one rectified image and its ink threshold.
#[derive(Clone, Copy, Debug)]
pub struct FillScorer<'a> {
    img: GrayImageView<'a>,
    mode: ScoreMode,
    threshold: u8,
    disk_shrink: f32,
    min_disk_coverage: f32,
}

impl<'a> FillScorer<'a> {
    pub fn new(img: &GrayImageView<'a>, params: FillScoreParams) -> Self {
        let threshold = params
            .ink_threshold
            .unwrap_or_else(|| otsu_threshold(img).min(params.max_auto_threshold));
        debug!("fill scorer: mode={:?} ink_threshold={threshold}", params.mode);
        Self {
            img: *img,
            mode: params.mode,
            threshold,
            disk_shrink: params.disk_shrink.clamp(0.0, 0.95),
            min_disk_coverage: params.min_disk_coverage.clamp(0.0, 1.0),
        }
    }

    pub fn ink_threshold(&self) -> u8 {
        self.threshold
    }

    /// Score one region.
    ///
    /// A window must lie fully inside the image; a disk must keep at least
    /// `min_disk_coverage` of its mask's bounds. Anything less is
    /// [`RegionScoreError::OutOfBounds`].
    pub fn score(&self, region: &Region) -> Result<f32, RegionScoreError> {
        let (w, h) = (self.img.width, self.img.height);
        let (x0, y0, x1, y1) = region
            .rect
            .pixel_span(w, h)
            .ok_or(RegionScoreError::OutOfBounds)?;

        let disk = match region.shape {
            RegionShape::Window => {
                if region.rect.pixel_coverage(w, h) < 1.0 {
                    return Err(RegionScoreError::OutOfBounds);
                }
                None
            }
            RegionShape::Disk(c) => {
                let r = c.radius * (1.0 - self.disk_shrink);
                if !(r.is_finite() && r > 0.0) {
                    return Err(RegionScoreError::Degenerate);
                }
                let mask = Circle::new(c.center, r).bounds();
                if mask.pixel_coverage(w, h) < self.min_disk_coverage {
                    return Err(RegionScoreError::OutOfBounds);
                }
                Some((c.center, r * r))
            }
        };

        let (mut count, mut ink, mut sum) = (0u64, 0u64, 0u64);
        for y in y0..y1 {
            let row = &self.img.data[y * self.img.width..(y + 1) * self.img.width];
            for (x, &v) in row.iter().enumerate().take(x1).skip(x0) {
                if let Some((c, r2)) = disk {
                    let (dx, dy) = (x as f32 - c.x, y as f32 - c.y);
                    if dx * dx + dy * dy > r2 {
                        continue;
                    }
                }
                count += 1;
                sum += v as u64;
                if v <= self.threshold {
                    ink += 1;
                }
            }
        }
        if count == 0 {
            return Err(RegionScoreError::Degenerate);
        }

        let score = match self.mode {
            ScoreMode::BinarizedRatio => ink as f32 / count as f32,
            ScoreMode::MeanIntensity => {
                let t = self.threshold.max(1) as f32;
                let mean = sum as f32 / count as f32;
                (t - mean) / t
            }
        };
        Ok(score.clamp(0.0, 1.0))
    }

    /// Score every question; a failing region drops its whole question.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip(self, grid), fields(questions = grid.len()))
    )]
    pub fn score_grid(&self, grid: &RegionGrid) -> ScoreMatrix {
        let mut scores = BTreeMap::new();
        let mut failures = Vec::new();

        'questions: for (q, regions) in grid.iter() {
            let mut row = [0.0f32; OPTION_COUNT];
            for (option, region) in OptionLetter::ALL.iter().zip(regions.iter()) {
                match self.score(region) {
                    Ok(s) => row[option.index()] = s,
                    Err(e) => {
                        warn!("question {q} option {option}: {e}; marking undetected");
                        failures.push(RegionFailure {
                            question: q,
                            option: *option,
                            error: e.to_string(),
                        });
                        continue 'questions;
                    }
                }
            }
            scores.insert(q, OptionScores(row));
        }

        ScoreMatrix {
            scores,
            failures,
            ink_threshold: self.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Point2;
    use omr_core::{CellRect, GrayImage};

    /// 40x20 paper with the left half of a 10x10 cell at (5,5) inked.
    fn half_inked() -> GrayImage {
        let mut img = GrayImage::new(40, 20, 240);
        for y in 5..15 {
            for x in 5..10 {
                img.data[y * 40 + x] = 20;
            }
        }
        img
    }

    #[test]
    fn binarized_ratio_counts_ink_pixels() {
        let img = half_inked();
        let scorer = FillScorer::new(&img.view(), FillScoreParams::default());
        let cell = Region::window(CellRect::new(5.0, 5.0, 10.0, 10.0));
        assert_abs_diff_eq!(scorer.score(&cell).unwrap(), 0.5, epsilon = 1e-6);
        let blank = Region::window(CellRect::new(20.0, 5.0, 10.0, 10.0));
        assert_eq!(scorer.score(&blank).unwrap(), 0.0);
    }

    #[test]
    fn mean_intensity_mode_is_bounded() {
        let img = half_inked();
        let params = FillScoreParams {
            mode: ScoreMode::MeanIntensity,
            ink_threshold: Some(128),
            ..FillScoreParams::default()
        };
        let scorer = FillScorer::new(&img.view(), params);
        let cell = Region::window(CellRect::new(5.0, 5.0, 5.0, 10.0));
        let s = scorer.score(&cell).unwrap();
        assert_abs_diff_eq!(s, (128.0 - 20.0) / 128.0, epsilon = 1e-5);
        let paper = Region::window(CellRect::new(20.0, 0.0, 10.0, 10.0));
        assert_eq!(scorer.score(&paper).unwrap(), 0.0);
    }

    #[test]
    fn disk_mask_ignores_outline() {
        let mut img = GrayImage::new(40, 40, 235);
        // ring of radius ~10 around (20, 20), 2 px thick
        for y in 0..40 {
            for x in 0..40 {
                let d = ((x as f32 - 20.0).powi(2) + (y as f32 - 20.0).powi(2)).sqrt();
                if (8.5..=10.5).contains(&d) {
                    img.data[y * 40 + x] = 30;
                }
            }
        }
        let scorer = FillScorer::new(&img.view(), FillScoreParams::default());
        let region = Region::disk(Circle::new(Point2::new(20.0, 20.0), 10.5));
        assert_eq!(scorer.score(&region).unwrap(), 0.0);
    }

    #[test]
    fn blank_paper_scores_zero() {
        let img = GrayImage::new(30, 30, 255);
        let scorer = FillScorer::new(&img.view(), FillScoreParams::default());
        let cell = Region::window(CellRect::new(0.0, 0.0, 30.0, 30.0));
        assert_eq!(scorer.score(&cell).unwrap(), 0.0);
    }

    #[test]
    fn partly_outside_regions_are_out_of_bounds() {
        let mut img = GrayImage::new(40, 20, 240);
        for y in 0..20 {
            img.data[y * 40 + 39] = 10;
        }
        let scorer = FillScorer::new(&img.view(), FillScoreParams::default());

        let straddling = Region::window(CellRect::new(38.5, 5.0, 20.0, 10.0));
        assert_eq!(scorer.score(&straddling), Err(RegionScoreError::OutOfBounds));
        let flush = Region::window(CellRect::new(20.0, 5.0, 20.0, 10.0));
        assert_abs_diff_eq!(scorer.score(&flush).unwrap(), 0.05, epsilon = 1e-6);

        // Shrunk mask of radius 7 around x=40 is half outside.
        let half_disk = Region::disk(Circle::new(Point2::new(40.0, 10.0), 10.0));
        assert_eq!(scorer.score(&half_disk), Err(RegionScoreError::OutOfBounds));
        let edge_disk = Region::disk(Circle::new(Point2::new(32.0, 10.0), 10.0));
        assert!(scorer.score(&edge_disk).is_ok());
    }

    #[test]
    fn failing_region_drops_only_its_question() {
        let img = half_inked();
        let scorer = FillScorer::new(&img.view(), FillScoreParams::default());
        let inside = Region::window(CellRect::new(0.0, 0.0, 4.0, 4.0));
        let outside = Region::window(CellRect::new(100.0, 0.0, 4.0, 4.0));
        let mut grid = RegionGrid::default();
        grid.questions.insert(1, [inside; OPTION_COUNT]);
        grid.questions.insert(2, [inside, inside, outside, inside, inside]);

        let m = scorer.score_grid(&grid);
        assert!(m.get(1).is_some());
        assert!(m.get(2).is_none());
        assert_eq!(m.failures.len(), 1);
        assert_eq!(m.failures[0].option, OptionLetter::C);
        assert_eq!(
            scorer.score(&outside),
            Err(RegionScoreError::OutOfBounds)
        );
    }
}
