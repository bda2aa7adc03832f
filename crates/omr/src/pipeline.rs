use crate::grade::{
    best_guess, decide_all, grade, AnswerKey, Decision, DecisionParams, GradingReport,
    GradingResult,
};
use crate::grid::{
    FillScoreParams, FillScorer, GridError, GridLocator, LayoutSpec, RegionGrid, ScoreMatrix,
};
use crate::rectify::{
    NormalizeError, NormalizeParams, RectifiedSheet, SheetNormalizer, TemplateAlignParams,
    TemplateAligner,
};
use crate::{ErrorKind, GradeError, SheetIssue};
use log::{info, warn};
use omr_core::{GrayImage, GrayImageView, OptionLetter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How photos are brought into the canonical sheet frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RectifyParams {
    /// Find the paper outline and warp it.
    Boundary(NormalizeParams),
    /// Align keypoints against a blank template image.
    Template(TemplateAlignParams),
    /// The input is already a top-down scan.
    Identity,
}

impl Default for RectifyParams {
    fn default() -> Self {
        Self::Boundary(NormalizeParams::default())
    }
}

/// Everything needed to grade one sheet except the answer key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraderParams {
    #[serde(default)]
    pub rectify: RectifyParams,
    pub layout: LayoutSpec,
    #[serde(default)]
    pub fill: FillScoreParams,
    #[serde(default)]
    pub decision: DecisionParams,
}

impl GraderParams {
    pub fn new(layout: LayoutSpec) -> Self {
        Self {
            rectify: RectifyParams::default(),
            layout,
            fill: FillScoreParams::default(),
            decision: DecisionParams::default(),
        }
    }

    pub fn decision_threshold(&self) -> f32 {
        self.decision.threshold_for(self.fill.mode)
    }
}

/// Every intermediate product of grading one sheet.
#[derive(Clone, Debug)]
pub struct SheetOutcome {
    pub sheet: RectifiedSheet,
    /// Empty when the grid could not be resolved.
    pub grid: RegionGrid,
    pub scores: ScoreMatrix,
    pub threshold: f32,
    pub decisions: BTreeMap<u32, Decision>,
    /// Most filled option of each scored question.
    pub best_guesses: BTreeMap<u32, OptionLetter>,
    pub result: GradingResult,
    pub report: GradingReport,
    pub issues: Vec<SheetIssue>,
}

/// End-to-end grader: rectify, locate, score, decide, grade.
///
/// Holds no per-sheet state; one grader can process many sheets, from
/// several threads.
#[derive(Clone, Debug)]
pub struct SheetGrader {
    params: GraderParams,
    template: Option<TemplateAligner>,
}

impl SheetGrader {
    pub fn new(params: GraderParams) -> Self {
        Self {
            params,
            template: None,
        }
    }

    /// Grader with a reference template for [`RectifyParams::Template`].
    pub fn with_template(
        params: GraderParams,
        template: &GrayImageView<'_>,
    ) -> Result<Self, GradeError> {
        let align = match &params.rectify {
            RectifyParams::Template(p) => p.clone(),
            _ => TemplateAlignParams::default(),
        };
        let aligner = TemplateAligner::new(template, align)?;
        Ok(Self {
            params,
            template: Some(aligner),
        })
    }

    pub fn params(&self) -> &GraderParams {
        &self.params
    }

    pub fn rectify(&self, img: &GrayImageView<'_>) -> Result<RectifiedSheet, GradeError> {
        let sheet = match &self.params.rectify {
            RectifyParams::Boundary(p) => SheetNormalizer::new(p.clone()).normalize(img)?,
            RectifyParams::Template(_) => self
                .template
                .as_ref()
                .ok_or(GradeError::MissingTemplate)?
                .align(img)?,
            RectifyParams::Identity => {
                if img.data.len() != img.width * img.height {
                    return Err(NormalizeError::InvalidImage {
                        width: img.width,
                        height: img.height,
                    }
                    .into());
                }
                RectifiedSheet::identity(img.to_owned_image())
            }
        };
        Ok(sheet)
    }

    /// Grade an `image` crate buffer.
    pub fn grade_image(
        &self,
        img: &::image::GrayImage,
        key: &AnswerKey,
    ) -> Result<SheetOutcome, GradeError> {
        self.grade_view(&gray_view(img), key)
    }

    /// Grade a raw row-major 8-bit grayscale buffer.
    pub fn grade_raw(
        &self,
        width: usize,
        height: usize,
        pixels: &[u8],
        key: &AnswerKey,
    ) -> Result<SheetOutcome, GradeError> {
        let expected = width
            .checked_mul(height)
            .ok_or(GradeError::InvalidGrayBuffer {
                expected: usize::MAX,
                got: pixels.len(),
            })?;
        if pixels.len() != expected || expected == 0 {
            return Err(GradeError::InvalidGrayBuffer {
                expected,
                got: pixels.len(),
            });
        }
        let view = GrayImageView {
            width,
            height,
            data: pixels,
        };
        self.grade_view(&view, key)
    }

    /// Grade a borrowed view.
    ///
    /// Fails only when no sheet is found or the layout is invalid. An
    /// unresolved grid yields a result with every question undetected.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            level = "info",
            skip(self, img, key),
            fields(w = img.width, h = img.height, questions = key.len())
        )
    )]
    pub fn grade_view(
        &self,
        img: &GrayImageView<'_>,
        key: &AnswerKey,
    ) -> Result<SheetOutcome, GradeError> {
        let sheet = self.rectify(img)?;
        let layout = &self.params.layout;
        if layout.questions != key.len() {
            warn!(
                "layout has {} questions but the key has {}; grading the key's questions",
                layout.questions,
                key.len()
            );
        }

        let mut issues = Vec::new();
        let grid = match GridLocator.locate(&sheet.view(), layout) {
            Ok(grid) => grid,
            Err(e @ GridError::GridUnresolved { .. }) => {
                warn!("{e}; every question will be undetected");
                issues.push(SheetIssue::new(ErrorKind::GridUnresolved, e.to_string()));
                RegionGrid::default()
            }
            Err(e) => return Err(e.into()),
        };

        let scores = FillScorer::new(&sheet.view(), self.params.fill.clone()).score_grid(&grid);
        issues.extend(scores.failures.iter().map(|f| {
            SheetIssue::new(
                ErrorKind::RegionScoreFailure,
                format!("question {} option {}: {}", f.question, f.option, f.error),
            )
        }));

        let threshold = self.params.decision_threshold();
        let decisions = decide_all(&scores, threshold);
        let best_guesses = scores
            .scores
            .iter()
            .map(|(q, s)| (*q, best_guess(s)))
            .collect();
        let result = grade(&decisions, key);
        let report = GradingReport::from_result(&result, key);
        info!(
            "sheet graded: {}/{} correct, {} issue(s)",
            result.correct,
            result.total,
            issues.len()
        );

        Ok(SheetOutcome {
            sheet,
            grid,
            scores,
            threshold,
            decisions,
            best_guesses,
            result,
            report,
            issues,
        })
    }

    /// Annotated RGB copy of the rectified sheet.
    pub fn render_debug(&self, outcome: &SheetOutcome) -> ::image::RgbImage {
        crate::debug::render_debug(outcome)
    }
}

/// Borrow an `image::GrayImage` as a [`GrayImageView`].
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Copy an owned sheet image into an `image` buffer.
pub(crate) fn to_image(img: &GrayImage) -> Option<::image::GrayImage> {
    let w = u32::try_from(img.width).ok()?;
    let h = u32::try_from(img.height).ok()?;
    ::image::GrayImage::from_raw(w, h, img.data.clone())
}
