//! Core types and utilities for answer-sheet recognition.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete image decoder; pixel data is passed around as
//! row-major grayscale buffers via [`GrayImageView`].

mod geometry;
mod homography;
mod image;
mod logger;
mod option;
mod threshold;

pub use geometry::{order_corners, rectified_size, shoelace_area, CellRect, Circle};
pub use homography::{estimate_homography, homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use option::{OptionLetter, ParseOptionError, OPTION_COUNT};
pub use threshold::{gray_histogram, otsu_threshold, otsu_threshold_from_histogram};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
