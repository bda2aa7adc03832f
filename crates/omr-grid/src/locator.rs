use crate::detected::detect_grid;
use crate::{
    fixed_grid, DetectedGridParams, FixedGridParams, GridError, GridStrategy, LayoutSpec,
    RegionGrid,
};
use log::debug;
use omr_core::GrayImageView;

/// A grid location strategy.
pub trait RegionLocator {
    fn locate_regions(
        &self,
        img: &GrayImageView<'_>,
        layout: &LayoutSpec,
    ) -> Result<RegionGrid, GridError>;
}

impl RegionLocator for FixedGridParams {
    fn locate_regions(
        &self,
        img: &GrayImageView<'_>,
        layout: &LayoutSpec,
    ) -> Result<RegionGrid, GridError> {
        Ok(fixed_grid(layout, self, img.width, img.height))
    }
}

impl RegionLocator for DetectedGridParams {
    fn locate_regions(
        &self,
        img: &GrayImageView<'_>,
        layout: &LayoutSpec,
    ) -> Result<RegionGrid, GridError> {
        detect_grid(img, layout, self)
    }
}

/// Dispatches to the strategy named by the layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridLocator;

impl GridLocator {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip(self, img, layout), fields(questions = layout.questions))
    )]
    pub fn locate(
        &self,
        img: &GrayImageView<'_>,
        layout: &LayoutSpec,
    ) -> Result<RegionGrid, GridError> {
        layout.validate()?;
        let strategy: &dyn RegionLocator = match &layout.grid {
            GridStrategy::Fixed(p) => p,
            GridStrategy::Detected(p) => p,
        };
        let grid = strategy.locate_regions(img, layout)?;
        debug!(
            "located {} of {} questions in {}x{} sheet",
            grid.len(),
            layout.questions,
            img.width,
            img.height
        );
        Ok(grid)
    }
}
