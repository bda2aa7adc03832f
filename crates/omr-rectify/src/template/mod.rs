//! Alignment of a photo to a blank reference sheet.
//!
//! The reference frame *is* the rectified frame: regions are laid out in
//! template pixel coordinates and the photo is warped onto them.

mod features;
mod ransac;

use crate::normalize::rect_corners;
use crate::{to_luma, NormalizeError, RectifiedSheet, RectifyMode, TemplateAlignParams};
use features::{extract_features, match_features, FeatureSet, TestPattern};
use log::debug;
use nalgebra::Point2;
use omr_core::{warp_perspective_gray, GrayImageView};
use ransac::fit_homography_ransac;
use serde::{Deserialize, Serialize};

/// Counters from one alignment attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMatchStats {
    pub template_keypoints: usize,
    pub photo_keypoints: usize,
    pub matches: usize,
    pub inliers: usize,
}

/// Keypoint aligner bound to one reference template.
///
/// Template features are computed once; [`TemplateAligner::align`] takes
/// `&self` and can be shared between threads.
#[derive(Clone, Debug)]
pub struct TemplateAligner {
    params: TemplateAlignParams,
    width: usize,
    height: usize,
    pattern: TestPattern,
    template: FeatureSet,
}

impl TemplateAligner {
    pub fn new(
        template: &GrayImageView<'_>,
        params: TemplateAlignParams,
    ) -> Result<Self, NormalizeError> {
        let pattern = TestPattern::new(params.patch_radius, params.seed);
        let features = extract_features(&to_luma(template)?, &pattern, &params);
        debug!(
            "template {}x{}: {} keypoints",
            template.width,
            template.height,
            features.len()
        );
        Ok(Self {
            params,
            width: template.width,
            height: template.height,
            pattern,
            template: features,
        })
    }

    pub fn params(&self) -> &TemplateAlignParams {
        &self.params
    }

    /// Size of the rectified output (the template size).
    pub fn frame_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn align(&self, img: &GrayImageView<'_>) -> Result<RectifiedSheet, NormalizeError> {
        self.align_with_stats(img).map(|(sheet, _)| sheet)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip(self, img), fields(w = img.width, h = img.height))
    )]
    pub fn align_with_stats(
        &self,
        img: &GrayImageView<'_>,
    ) -> Result<(RectifiedSheet, TemplateMatchStats), NormalizeError> {
        let p = &self.params;
        let photo = extract_features(&to_luma(img)?, &self.pattern, p);
        let matches = match_features(&self.template, &photo, p.max_hamming, p.max_matches);

        let mut stats = TemplateMatchStats {
            template_keypoints: self.template.len(),
            photo_keypoints: photo.len(),
            matches: matches.len(),
            inliers: 0,
        };

        let src: Vec<Point2<f32>> = matches
            .iter()
            .map(|m| self.template.points[m.template])
            .collect();
        let dst: Vec<Point2<f32>> = matches.iter().map(|m| photo.points[m.photo]).collect();

        let fit = fit_homography_ransac(
            &src,
            &dst,
            p.ransac_threshold_px,
            p.ransac_iterations,
            p.seed,
        );
        stats.inliers = fit.as_ref().map_or(0, |f| f.inliers);
        debug!(
            "template alignment: keypoints {}/{} matches {} inliers {}",
            stats.template_keypoints, stats.photo_keypoints, stats.matches, stats.inliers
        );

        let fit = match fit {
            Some(f) if f.inliers >= p.min_inliers.max(4) => f,
            _ => {
                return Err(NormalizeError::TemplateMismatch {
                    matches: stats.matches,
                    inliers: stats.inliers,
                })
            }
        };

        let corners = rect_corners(self.width as f32, self.height as f32).map(|c| fit.h.apply(c));
        let sheet = RectifiedSheet {
            image: warp_perspective_gray(img, &fit.h, self.width, self.height),
            h_img_from_rect: fit.h,
            corners,
            mode: RectifyMode::Template,
        };
        Ok((sheet, stats))
    }
}
