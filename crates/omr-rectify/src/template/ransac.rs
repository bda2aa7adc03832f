use nalgebra::Point2;
use omr_core::{estimate_homography, homography_from_4pt, Homography};
use rand::SeedableRng;

#[derive(Clone, Debug)]
pub(crate) struct RansacFit {
    pub(crate) h: Homography,
    pub(crate) inlier_mask: Vec<bool>,
    pub(crate) inliers: usize,
}

fn sample_indices(rng: &mut impl rand::Rng, n: usize, k: usize) -> Vec<usize> {
    debug_assert!(k <= n);
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

fn inlier_mask(h: &Homography, src: &[Point2<f32>], dst: &[Point2<f32>], thr: f32) -> Vec<bool> {
    src.iter()
        .zip(dst)
        .map(|(&s, &d)| h.transfer_error(s, d) < thr)
        .collect()
}

/// Robust `dst ~ H * src` from putative correspondences.
///
/// Minimal 4-point models are scored by inlier count; the best one is refit
/// on its inliers with the normalized DLT. Returns `None` with fewer than
/// four correspondences or when no model could be solved.
pub(crate) fn fit_homography_ransac(
    src: &[Point2<f32>],
    dst: &[Point2<f32>],
    threshold_px: f32,
    iterations: usize,
    seed: u64,
) -> Option<RansacFit> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return None;
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut best: Option<(Homography, Vec<bool>, usize)> = None;

    for _ in 0..iterations.max(1) {
        let idx = sample_indices(&mut rng, n, 4);
        let s4 = [src[idx[0]], src[idx[1]], src[idx[2]], src[idx[3]]];
        let d4 = [dst[idx[0]], dst[idx[1]], dst[idx[2]], dst[idx[3]]];
        let Some(h) = homography_from_4pt(&s4, &d4) else {
            continue;
        };

        let mask = inlier_mask(&h, src, dst, threshold_px);
        let count = mask.iter().filter(|&&m| m).count();
        if best.as_ref().is_none_or(|b| count > b.2) {
            best = Some((h, mask, count));
            if count * 10 > n * 9 {
                break;
            }
        }
    }

    let (best_h, best_mask, best_count) = best?;
    let (s_in, d_in): (Vec<_>, Vec<_>) = src
        .iter()
        .zip(dst)
        .zip(&best_mask)
        .filter(|(_, m)| **m)
        .map(|((&s, &d), _)| (s, d))
        .unzip();

    let refit = estimate_homography(&s_in, &d_in)
        .map(|h| {
            let mask = inlier_mask(&h, src, dst, threshold_px);
            let count = mask.iter().filter(|&&m| m).count();
            (h, mask, count)
        })
        .filter(|r| r.2 >= best_count)
        .unwrap_or((best_h, best_mask, best_count));

    Some(RansacFit {
        h: refit.0,
        inlier_mask: refit.1,
        inliers: refit.2,
    })
}
