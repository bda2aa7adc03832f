//! Answer-sheet (OMR) grading from photos and scans.
//!
//! This crate ties the stage crates together:
//! - rectification of the photographed sheet (`omr::rectify`);
//! - location and fill scoring of option bubbles (`omr::grid`);
//! - mark decisions, grading and statistics (`omr::grade`);
//! - JSON job files, reports and an annotated debug image.
//!
//! ## Quickstart
//!
//! ```no_run
//! use omr::grade::AnswerKey;
//! use omr::grid::{FixedGridParams, LayoutSpec};
//! use omr::{GraderParams, SheetGrader};
//! use image::ImageReader;
//! use std::collections::BTreeMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("sheet.jpg")?.decode()?.to_luma8();
//! let raw = BTreeMap::from([("1".to_string(), "A".to_string())]);
//! let key = AnswerKey::from_raw(&raw)?;
//!
//! let layout = LayoutSpec::fixed(1, 1, FixedGridParams::default());
//! let grader = SheetGrader::new(GraderParams::new(layout));
//! let outcome = grader.grade_image(&img, &key)?;
//! println!("grade: {:.2}", outcome.result.grade);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `omr::core`: image views, homographies, Otsu threshold, option letters.
//! - `omr::rectify`: boundary and template rectification.
//! - `omr::grid`: layouts, fixed and detected grids, fill scoring.
//! - `omr::grade`: answer keys, decisions, grading results and reports.

pub use omr_core as core;
pub use omr_grade as grade;
pub use omr_grid as grid;
pub use omr_rectify as rectify;

mod config;
mod debug;
mod error;
mod pipeline;
mod report;

pub use config::{load_json, write_json, GradeJobConfig, KeySource};
pub use debug::render_debug;
pub use error::{ErrorKind, GradeError, SheetIssue};
pub use pipeline::{gray_view, GraderParams, RectifyParams, SheetGrader, SheetOutcome};
pub use report::{GridKind, LayoutSummary, QuestionScores, SheetReport};

pub use omr_core::OptionLetter;
pub use omr_grade::{AnswerKey, Decision, GradingResult, QuestionStatus};
pub use omr_grid::LayoutSpec;
