use crate::{find_sheet_quad, NormalizeError, NormalizeParams};
use log::debug;
use nalgebra::Point2;
use omr_core::{
    homography_from_4pt, rectified_size, warp_perspective_gray, GrayImage, GrayImageView,
    Homography,
};
use serde::{Deserialize, Serialize};

/// How a [`RectifiedSheet`] was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectifyMode {
    /// Boundary quad; `from_polygon == false` means the bounding-box fallback.
    Boundary { from_polygon: bool },
    Template,
    /// Input was used as-is.
    Identity,
}

/// Sheet image in the canonical, axis-aligned frame.
#[derive(Clone, Debug)]
pub struct RectifiedSheet {
    pub image: GrayImage,
    /// Maps rectified pixel coordinates into the source photo.
    pub h_img_from_rect: Homography,
    /// Sheet corners in the photo (TL, TR, BR, BL).
    pub corners: [Point2<f32>; 4],
    pub mode: RectifyMode,
}

impl RectifiedSheet {
    /// Wrap an already aligned image without resampling.
    pub fn identity(image: GrayImage) -> Self {
        let (w, h) = (image.width as f32, image.height as f32);
        Self {
            corners: rect_corners(w, h),
            image,
            h_img_from_rect: Homography::identity(),
            mode: RectifyMode::Identity,
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        self.image.view()
    }
}

/// Pixel-center corners of a `w x h` frame, TL/TR/BR/BL.
pub(crate) fn rect_corners(w: f32, h: f32) -> [Point2<f32>; 4] {
    let (x1, y1) = ((w - 1.0).max(0.0), (h - 1.0).max(0.0));
    [
        Point2::new(0.0, 0.0),
        Point2::new(x1, 0.0),
        Point2::new(x1, y1),
        Point2::new(0.0, y1),
    ]
}

/// Boundary-based rectification.
#[derive(Clone, Debug, Default)]
pub struct SheetNormalizer {
    pub params: NormalizeParams,
}

impl SheetNormalizer {
    pub fn new(params: NormalizeParams) -> Self {
        Self { params }
    }

    /// Detect the sheet outline and warp it into a top-down frame.
    ///
    /// The output size is the longer of each pair of opposing quad edges.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip(self, img), fields(w = img.width, h = img.height))
    )]
    pub fn normalize(&self, img: &GrayImageView<'_>) -> Result<RectifiedSheet, NormalizeError> {
        let quad = find_sheet_quad(img, &self.params)?;
        let mut sheet = self.warp_quad(img, &quad.corners)?;
        sheet.mode = RectifyMode::Boundary {
            from_polygon: quad.from_polygon,
        };
        Ok(sheet)
    }

    /// Warp the region bounded by already ordered corners (TL, TR, BR, BL).
    pub fn warp_quad(
        &self,
        img: &GrayImageView<'_>,
        corners: &[Point2<f32>; 4],
    ) -> Result<RectifiedSheet, NormalizeError> {
        let (width, height) = rectified_size(corners);
        if width < self.params.min_side_px || height < self.params.min_side_px {
            return Err(NormalizeError::DegenerateQuad { width, height });
        }

        let dst = rect_corners(width as f32, height as f32);
        let h_img_from_rect =
            homography_from_4pt(&dst, corners).ok_or(NormalizeError::HomographyFailed)?;
        debug!("rectifying sheet to {width}x{height}");

        Ok(RectifiedSheet {
            image: warp_perspective_gray(img, &h_img_from_rect, width, height),
            h_img_from_rect,
            corners: *corners,
            mode: RectifyMode::Boundary { from_polygon: true },
        })
    }
}
