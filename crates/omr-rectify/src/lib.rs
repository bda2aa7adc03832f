//! Rectification of photographed answer sheets.
//!
//! Two modes produce the same [`RectifiedSheet`]:
//! - [`SheetNormalizer`] finds the paper boundary, approximates it by a
//!   quadrilateral and warps it to an axis-aligned frame;
//! - [`TemplateAligner`] matches binary keypoint descriptors against a blank
//!   reference sheet and fits a homography with RANSAC.

mod boundary;
mod buffer;
mod error;
mod normalize;
mod params;
mod template;

pub use boundary::{find_sheet_quad, SheetQuad};
pub use buffer::{from_luma, to_luma};
pub use error::NormalizeError;
pub use normalize::{RectifiedSheet, RectifyMode, SheetNormalizer};
pub use params::{NormalizeParams, TemplateAlignParams};
pub use template::{TemplateAligner, TemplateMatchStats};

pub use omr_core::{order_corners, rectified_size};
