//! FAST-9 keypoints with 256-bit binary intensity-comparison descriptors.

use crate::buffer::luma_at;
use crate::TemplateAlignParams;
use image::GrayImage as LumaImage;
use imageproc::corners::corners_fast9;
use imageproc::filter::gaussian_blur_f32;
use nalgebra::Point2;
use rand::{Rng, SeedableRng};

const DESCRIPTOR_BITS: usize = 256;
/// Keypoints closer than this to a stronger one are suppressed.
const MIN_KEYPOINT_SEPARATION: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Descriptor([u64; 4]);

impl Descriptor {
    pub(crate) fn hamming(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// Fixed set of pixel-pair comparisons inside the descriptor patch.
#[derive(Clone, Debug)]
pub(crate) struct TestPattern {
    radius: i32,
    pairs: Vec<[(i32, i32); 2]>,
}

impl TestPattern {
    pub(crate) fn new(radius: u32, seed: u64) -> Self {
        let r = radius.max(1) as i32;
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut offset = || (rng.gen_range(-r..=r), rng.gen_range(-r..=r));
        let pairs = (0..DESCRIPTOR_BITS)
            .map(|_| [offset(), offset()])
            .collect();
        Self { radius: r, pairs }
    }

    fn describe(&self, img: &LumaImage, cx: i32, cy: i32) -> Descriptor {
        let mut bits = [0u64; 4];
        for (i, [(ax, ay), (bx, by)]) in self.pairs.iter().enumerate() {
            if luma_at(img, cx + ax, cy + ay) < luma_at(img, cx + bx, cy + by) {
                bits[i / 64] |= 1 << (i % 64);
            }
        }
        Descriptor(bits)
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct FeatureSet {
    pub(crate) points: Vec<Point2<f32>>,
    pub(crate) descriptors: Vec<Descriptor>,
}

impl FeatureSet {
    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }
}

/// Detect the strongest well-separated FAST corners and describe them.
pub(crate) fn extract_features(
    img: &LumaImage,
    pattern: &TestPattern,
    params: &TemplateAlignParams,
) -> FeatureSet {
    let r = pattern.radius;
    let (w, h) = (img.width() as i32, img.height() as i32);
    if w <= 2 * r || h <= 2 * r {
        return FeatureSet::default();
    }

    let mut corners = corners_fast9(img, params.fast_threshold);
    corners.retain(|c| {
        let (x, y) = (c.x as i32, c.y as i32);
        x >= r && y >= r && x < w - r && y < h - r
    });
    corners.sort_by(|a, b| b.score.total_cmp(&a.score).then((a.y, a.x).cmp(&(b.y, b.x))));

    let mut kept: Vec<Point2<f32>> = Vec::with_capacity(params.max_keypoints);
    for c in &corners {
        if kept.len() >= params.max_keypoints {
            break;
        }
        let p = Point2::new(c.x as f32, c.y as f32);
        if kept
            .iter()
            .all(|q| (q - p).norm() >= MIN_KEYPOINT_SEPARATION)
        {
            kept.push(p);
        }
    }

    let smoothed;
    let sample_from = if params.patch_blur_sigma > 0.0 {
        smoothed = gaussian_blur_f32(img, params.patch_blur_sigma);
        &smoothed
    } else {
        img
    };
    let descriptors = kept
        .iter()
        .map(|p| pattern.describe(sample_from, p.x as i32, p.y as i32))
        .collect();

    FeatureSet {
        points: kept,
        descriptors,
    }
}

/// Correspondence between a template feature and a photo feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FeatureMatch {
    pub(crate) template: usize,
    pub(crate) photo: usize,
    pub(crate) distance: u32,
}

fn nearest(d: &Descriptor, set: &[Descriptor]) -> Option<(usize, u32)> {
    set.iter()
        .enumerate()
        .map(|(i, o)| (i, d.hamming(o)))
        .min_by_key(|&(i, dist)| (dist, i))
}

/// Mutual nearest neighbours under Hamming distance, best `max_matches` first.
pub(crate) fn match_features(
    template: &FeatureSet,
    photo: &FeatureSet,
    max_hamming: u32,
    max_matches: usize,
) -> Vec<FeatureMatch> {
    let mut matches: Vec<FeatureMatch> = template
        .descriptors
        .iter()
        .enumerate()
        .filter_map(|(ti, d)| {
            let (pi, distance) = nearest(d, &photo.descriptors)?;
            let (back, _) = nearest(&photo.descriptors[pi], &template.descriptors)?;
            (back == ti && distance <= max_hamming).then_some(FeatureMatch {
                template: ti,
                photo: pi,
                distance,
            })
        })
        .collect();
    matches.sort_by_key(|m| (m.distance, m.template));
    matches.truncate(max_matches);
    matches
}
