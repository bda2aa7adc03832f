//! Global Otsu thresholding over gray images.
//!
//! The returned threshold `t` splits intensities into `<= t` (ink) and
//! `> t` (paper).

use crate::GrayImageView;

/// 256-bin intensity histogram.
pub fn gray_histogram(img: &GrayImageView<'_>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in img.data {
        hist[v as usize] += 1;
    }
    hist
}

/// Otsu threshold of a whole image. Empty images yield 127.
pub fn otsu_threshold(img: &GrayImageView<'_>) -> u8 {
    otsu_threshold_from_histogram(&gray_histogram(img))
}

/// Otsu threshold maximizing between-class variance.
///
/// Flat histograms return their single value; histograms with only two
/// occupied bins split at the midpoint.
pub fn otsu_threshold_from_histogram(hist: &[u32; 256]) -> u8 {
    let occupied: Vec<usize> = (0..256).filter(|&i| hist[i] > 0).collect();
    let (Some(&lo), Some(&hi)) = (occupied.first(), occupied.last()) else {
        return 127;
    };
    if lo == hi {
        return lo as u8;
    }
    if occupied.len() == 2 {
        return ((lo + hi) / 2) as u8;
    }

    let total: f64 = hist.iter().map(|&h| h as f64).sum();
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrayImage;

    #[test]
    fn splits_ink_from_paper() {
        let mut data = vec![230u8; 400];
        for (i, v) in data.iter_mut().enumerate().take(120) {
            *v = 30 + (i % 20) as u8;
        }
        data[300] = 200;
        let img = GrayImage {
            width: 20,
            height: 20,
            data,
        };
        let t = otsu_threshold(&img.view());
        assert!((49..200).contains(&t), "threshold {t}");
    }

    #[test]
    fn degenerate_histograms() {
        let mut hist = [0u32; 256];
        assert_eq!(otsu_threshold_from_histogram(&hist), 127);
        hist[90] = 10;
        assert_eq!(otsu_threshold_from_histogram(&hist), 90);
        hist[250] = 3;
        assert_eq!(otsu_threshold_from_histogram(&hist), 170);
    }
}
