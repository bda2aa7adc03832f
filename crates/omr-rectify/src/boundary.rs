//! Sheet boundary extraction: Otsu mask of the bright paper, largest outer
//! contour, Douglas-Peucker quad (bounding box when the approximation does
//! not have four vertices).

use crate::{to_luma, NormalizeError, NormalizeParams};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use log::debug;
use nalgebra::Point2;
use omr_core::{order_corners, otsu_threshold, shoelace_area, GrayImageView};

/// Sheet outline in photo coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SheetQuad {
    /// Top-left, top-right, bottom-right, bottom-left.
    pub corners: [Point2<f32>; 4],
    /// Area enclosed by the traced contour, px^2.
    pub contour_area: f32,
    /// `false` when the corners come from the contour's bounding box.
    pub from_polygon: bool,
}

fn to_points(pts: &[Point<u32>]) -> Vec<Point2<f32>> {
    pts.iter().map(|p| Point2::new(p.x as f32, p.y as f32)).collect()
}

fn bounding_box(pts: &[Point<u32>]) -> [Point2<f32>; 4] {
    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0u32, 0u32);
    for p in pts {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    let (x0, y0, x1, y1) = (x0 as f32, y0 as f32, x1 as f32, y1 as f32);
    [
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ]
}

/// Locate the sheet outline in a photo.
///
/// Paper is assumed brighter than the background. A sheet that fills the
/// whole frame yields the frame itself.
pub fn find_sheet_quad(
    img: &GrayImageView<'_>,
    params: &NormalizeParams,
) -> Result<SheetQuad, NormalizeError> {
    let luma = to_luma(img)?;
    let mut mask = if params.blur_sigma > 0.0 {
        gaussian_blur_f32(&luma, params.blur_sigma)
    } else {
        luma
    };

    let t = otsu_threshold(&GrayImageView {
        width: img.width,
        height: img.height,
        data: mask.as_raw(),
    });
    for p in mask.pixels_mut() {
        p.0[0] = if p.0[0] > t { 255 } else { 0 };
    }

    let contours: Vec<Contour<u32>> = find_contours(&mask);
    let (best, area) = contours
        .iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.points.len() >= 4)
        .map(|c| (c, shoelace_area(&to_points(&c.points))))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or(NormalizeError::NoSheetDetected)?;

    let min_area = params.min_area_frac * (img.width * img.height) as f32;
    debug!(
        "sheet boundary: otsu={t} contours={} largest_area={area:.0} min_area={min_area:.0}",
        contours.len()
    );
    if area < min_area {
        return Err(NormalizeError::NoSheetDetected);
    }

    let eps = params.poly_epsilon_frac as f64 * arc_length(&best.points, true);
    let mut approx = approximate_polygon_dp(&best.points, eps, true);
    if approx.len() > 1 && approx.first() == approx.last() {
        approx.pop();
    }
    let (raw, from_polygon) = match <[Point<u32>; 4]>::try_from(approx.as_slice()) {
        Ok(quad) => (quad.map(|p| Point2::new(p.x as f32, p.y as f32)), true),
        Err(_) => {
            debug!(
                "boundary polygon has {} vertices; using bounding box",
                approx.len()
            );
            (bounding_box(&best.points), false)
        }
    };

    Ok(SheetQuad {
        corners: order_corners(&raw),
        contour_area: area,
        from_polygon,
    })
}
