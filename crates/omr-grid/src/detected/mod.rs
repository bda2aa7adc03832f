//! Grid assembly from detected circular marks.

mod circles;
mod dedup;
mod rows;

pub use circles::{find_circles, DetectedCircle};
pub use dedup::dedup_circles;
pub use rows::{assemble_rows, split_columns, RowAssembly, RowOutcome, RowRecord};

use crate::{DetectedGridParams, GridError, LayoutSpec, RegionGrid};
use log::info;
use omr_core::GrayImageView;

pub(crate) fn detect_grid(
    img: &GrayImageView<'_>,
    layout: &LayoutSpec,
    params: &DetectedGridParams,
) -> Result<RegionGrid, GridError> {
    let raw = find_circles(img, params);
    let raw_count = raw.len();
    let circles = dedup_circles(raw, params.dedup_distance);
    if circles.is_empty() {
        return Err(GridError::GridUnresolved {
            reason: "no mark shapes detected".into(),
        });
    }

    let (columns, divider) = split_columns(&circles, layout.columns);
    let assembly = assemble_rows(&columns, layout.questions, params);
    if assembly.question_rows() == 0 {
        return Err(GridError::GridUnresolved {
            reason: format!(
                "{} shapes detected but no row has at least {} of them",
                circles.len(),
                params.min_row_detections
            ),
        });
    }

    let grid = assembly.into_grid(divider);
    info!(
        "detected grid: {raw_count} circles ({} after dedup), {} questions mapped, {} rows dropped",
        circles.len(),
        grid.len(),
        grid.dropped_rows.len()
    );
    Ok(grid)
}
