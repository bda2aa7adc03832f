use crate::NormalizeError;
use image::{GrayImage as LumaImage, Luma};
use omr_core::{GrayImage, GrayImageView};

/// Copy a borrowed view into an `image` buffer for `imageproc` routines.
pub fn to_luma(src: &GrayImageView<'_>) -> Result<LumaImage, NormalizeError> {
    let invalid = NormalizeError::InvalidImage {
        width: src.width,
        height: src.height,
    };
    if src.data.len() != src.width * src.height {
        return Err(invalid);
    }
    let w = u32::try_from(src.width).map_err(|_| invalid.clone())?;
    let h = u32::try_from(src.height).map_err(|_| invalid.clone())?;
    LumaImage::from_raw(w, h, src.data.to_vec()).ok_or(invalid)
}

pub fn from_luma(img: &LumaImage) -> GrayImage {
    GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

#[inline]
pub(crate) fn luma_at(img: &LumaImage, x: i32, y: i32) -> u8 {
    let Luma([v]) = *img.get_pixel(x as u32, y as u32);
    v
}
