//! Circular mark detection: gradient-voting radial symmetry for centres,
//! then a radial edge search for each centre's radius.

use crate::DetectedGridParams;
use image::{GrayImage as LumaImage, ImageBuffer, Luma};
use log::debug;
use nalgebra::Point2;
use omr_core::{sample_bilinear, Circle, GrayImageView};
use serde::{Deserialize, Serialize};

/// Boundary samples per radius hypothesis.
const RING_SAMPLES: usize = 32;
/// Radial step of the radius search.
const RADIUS_STEP: f32 = 0.5;
/// Minimum outward intensity rise for a boundary sample to count as edge.
const EDGE_CONTRAST: f32 = 12.0;

/// A detected bubble outline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedCircle {
    pub circle: Circle,
    /// Smoothed accumulator value at the centre.
    pub score: f32,
    /// Fraction of boundary samples with a dark-to-bright outward edge.
    pub edge_support: f32,
}

fn to_luma(img: &GrayImageView<'_>) -> Option<LumaImage> {
    LumaImage::from_raw(img.width as u32, img.height as u32, img.data.to_vec())
}

/// Denoise and contrast-equalize before detection.
fn preprocess(img: &GrayImageView<'_>, params: &DetectedGridParams) -> Option<LumaImage> {
    let mut luma = to_luma(img)?;
    if params.median_radius > 0 {
        luma = imageproc::filter::median_filter(&luma, params.median_radius, params.median_radius);
    }
    if params.blur_sigma > 0.0 {
        luma = imageproc::filter::gaussian_blur_f32(&luma, params.blur_sigma);
    }
    if params.equalize {
        luma = imageproc::contrast::equalize_histogram(&luma);
    }
    Some(luma)
}

#[inline]
fn bilinear_add_in_bounds(accum: &mut [f32], stride: usize, x: f32, y: f32, weight: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * stride + x0;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Candidate centres as (x, y, smoothed votes), strongest first.
fn vote_centres(gray: &LumaImage, params: &DetectedGridParams) -> Vec<(f32, f32, f32)> {
    let (w, h) = gray.dimensions();
    let gx = imageproc::gradients::horizontal_scharr(gray);
    let gy = imageproc::gradients::vertical_scharr(gray);
    let (gx_raw, gy_raw) = (gx.as_raw(), gy.as_raw());

    let max_mag = gx_raw
        .iter()
        .zip(gy_raw.iter())
        .map(|(&a, &b)| (a as f32).hypot(b as f32))
        .fold(0.0f32, f32::max);
    if max_mag < 1e-6 {
        return Vec::new();
    }
    let threshold = params.grad_threshold * max_mag;

    let mut radii = Vec::new();
    let mut r = params.min_radius;
    while r <= params.max_radius {
        radii.push(r);
        r += 1.0;
    }

    let stride = w as usize;
    let mut accum = vec![0.0f32; stride * h as usize];
    let (x_limit, y_limit) = ((w - 1) as f32, (h - 1) as f32);
    for y in 0..h as usize {
        for x in 0..stride {
            let idx = y * stride + x;
            let (gxv, gyv) = (gx_raw[idx] as f32, gy_raw[idx] as f32);
            let mag = gxv.hypot(gyv);
            if mag < threshold {
                continue;
            }
            let (dx, dy) = (gxv / mag, gyv / mag);
            for &r in &radii {
                for s in [r, -r] {
                    let (vx, vy) = (x as f32 + dx * s, y as f32 + dy * s);
                    if vx >= 0.0 && vx < x_limit && vy >= 0.0 && vy < y_limit {
                        bilinear_add_in_bounds(&mut accum, stride, vx, vy, mag);
                    }
                }
            }
        }
    }

    let Some(accum_img) = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w, h, accum) else {
        return Vec::new();
    };
    let smoothed = if params.accum_sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&accum_img, params.accum_sigma)
    } else {
        accum_img
    };
    let data = smoothed.as_raw();
    let max_val = data.iter().copied().fold(0.0f32, f32::max);
    if max_val < 1e-6 {
        return Vec::new();
    }
    let vote_threshold = params.min_vote_frac * max_val;

    let nms_r = params.min_radius.ceil().max(1.0) as i32;
    let nms_r_sq = (nms_r * nms_r) as f32;
    let offsets: Vec<isize> = (-nms_r..=nms_r)
        .flat_map(|dy| (-nms_r..=nms_r).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| (dx, dy) != (0, 0) && ((dx * dx + dy * dy) as f32) <= nms_r_sq)
        .map(|(dx, dy)| dy as isize * stride as isize + dx as isize)
        .collect();

    let mut peaks = Vec::new();
    for y in nms_r..(h as i32 - nms_r) {
        for x in nms_r..(w as i32 - nms_r) {
            let idx = y as usize * stride + x as usize;
            let val = data[idx];
            if val < vote_threshold {
                continue;
            }
            let is_max = offsets.iter().all(|&off| {
                let n = idx.wrapping_add_signed(off);
                data[n] < val || (data[n] == val && n > idx)
            });
            if is_max {
                peaks.push((x as f32, y as f32, val));
            }
        }
    }
    peaks.sort_by(|a, b| b.2.total_cmp(&a.2));
    peaks
}

/// Radius with the strongest mean outward dark-to-bright edge, and the
/// fraction of boundary samples supporting it.
fn estimate_radius(
    img: &GrayImageView<'_>,
    c: Point2<f32>,
    params: &DetectedGridParams,
) -> Option<(f32, f32)> {
    let dirs: Vec<(f32, f32)> = (0..RING_SAMPLES)
        .map(|i| {
            let a = i as f32 * std::f32::consts::TAU / RING_SAMPLES as f32;
            (a.cos(), a.sin())
        })
        .collect();

    let mut best: Option<(f32, f32, f32)> = None;
    let mut r = params.min_radius;
    while r <= params.max_radius {
        let (mut sum, mut hits) = (0.0f32, 0usize);
        for &(ux, uy) in &dirs {
            let outer = sample_bilinear(img, c.x + ux * (r + 1.0), c.y + uy * (r + 1.0));
            let inner = sample_bilinear(img, c.x + ux * (r - 1.0), c.y + uy * (r - 1.0));
            let d = outer - inner;
            sum += d;
            if d > EDGE_CONTRAST {
                hits += 1;
            }
        }
        let mean = sum / RING_SAMPLES as f32;
        if best.is_none_or(|b| mean > b.1) {
            best = Some((r, mean, hits as f32 / RING_SAMPLES as f32));
        }
        r += RADIUS_STEP;
    }

    let (radius, mean, support) = best?;
    (mean > EDGE_CONTRAST && support >= params.min_edge_support).then_some((radius, support))
}

/// Detect circular marks in a rectified sheet.
///
/// Returned circles are strongest first; near-duplicates are not merged
/// (see [`dedup_circles`](crate::dedup_circles)).
pub fn find_circles(img: &GrayImageView<'_>, params: &DetectedGridParams) -> Vec<DetectedCircle> {
    if img.width < 4 || img.height < 4 || params.max_radius < params.min_radius {
        return Vec::new();
    }
    let Some(pre) = preprocess(img, params) else {
        return Vec::new();
    };
    let mut peaks = vote_centres(&pre, params);
    if let Some(cap) = params.max_candidates {
        peaks.truncate(cap);
    }

    let pre_view = GrayImageView {
        width: img.width,
        height: img.height,
        data: pre.as_raw(),
    };
    let circles: Vec<DetectedCircle> = peaks
        .iter()
        .filter_map(|&(x, y, score)| {
            let center = Point2::new(x, y);
            let (radius, edge_support) = estimate_radius(&pre_view, center, params)?;
            Some(DetectedCircle {
                circle: Circle::new(center, radius),
                score,
                edge_support,
            })
        })
        .collect();
    debug!(
        "circle detection: {} vote peaks, {} circles",
        peaks.len(),
        circles.len()
    );
    circles
}
