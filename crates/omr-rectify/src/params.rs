use serde::{Deserialize, Serialize};

/// Boundary-based sheet normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeParams {
    /// Gaussian pre-blur sigma in pixels; `0` disables the blur.
    pub blur_sigma: f32,
    /// Smallest accepted sheet area as a fraction of the photo area.
    pub min_area_frac: f32,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub poly_epsilon_frac: f32,
    /// Rectified sheets narrower or shorter than this are rejected.
    pub min_side_px: usize,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            min_area_frac: 0.05,
            poly_epsilon_frac: 0.02,
            min_side_px: 16,
        }
    }
}

/// Keypoint-based alignment against a reference template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateAlignParams {
    /// FAST-9 intensity threshold.
    pub fast_threshold: u8,
    /// Strongest keypoints kept per image.
    pub max_keypoints: usize,
    /// Half size of the square descriptor patch.
    pub patch_radius: u32,
    /// Smoothing applied before descriptor sampling.
    pub patch_blur_sigma: f32,
    /// Best mutual matches kept for model fitting.
    pub max_matches: usize,
    /// Matches with a larger Hamming distance are discarded.
    pub max_hamming: u32,
    /// RANSAC inlier threshold (template-to-photo transfer error, px).
    pub ransac_threshold_px: f32,
    pub ransac_iterations: usize,
    /// Minimum inliers required to accept the alignment.
    pub min_inliers: usize,
    /// Seed for descriptor test pairs and RANSAC sampling.
    pub seed: u64,
}

impl Default for TemplateAlignParams {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_keypoints: 500,
            patch_radius: 15,
            patch_blur_sigma: 2.0,
            max_matches: 50,
            max_hamming: 80,
            ransac_threshold_px: 5.0,
            ransac_iterations: 500,
            min_inliers: 8,
            seed: 0x0a11_5eed,
        }
    }
}
