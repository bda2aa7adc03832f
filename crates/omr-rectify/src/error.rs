#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("no sheet boundary detected")]
    NoSheetDetected,
    #[error("sheet quadrilateral is degenerate ({width}x{height} px)")]
    DegenerateQuad { width: usize, height: usize },
    #[error("homography estimation failed")]
    HomographyFailed,
    #[error("template alignment failed (matches={matches}, inliers={inliers})")]
    TemplateMismatch { matches: usize, inliers: usize },
    #[error("image buffer does not match {width}x{height}")]
    InvalidImage { width: usize, height: usize },
}
