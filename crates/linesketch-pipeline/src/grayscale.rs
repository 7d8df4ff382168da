//! Image decoding, grayscale conversion and PNG encoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGB
//! photo the pipeline crops and scales. The save artifact goes the other
//! way: a grayscale raster encoded as PNG bytes.

use image::{GrayImage, ImageEncoder, Luma, RgbImage};

use crate::types::SketchError;

/// Decode raw image bytes into an RGB image.
///
/// Alpha, if present, is dropped.
///
/// # Errors
///
/// Returns [`SketchError::EmptyInput`] if `bytes` is empty.
/// Returns [`SketchError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, SketchError> {
    if bytes.is_empty() {
        return Err(SketchError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Convert to grayscale with `0.299*R + 0.587*G + 0.114*B`, rounded.
#[must_use = "returns the grayscale image"]
pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let v = 0.114f32.mul_add(
            f32::from(b),
            0.299f32.mul_add(f32::from(r), 0.587 * f32::from(g)),
        );
        Luma([crate::arith::saturate_round(v)])
    })
}

/// Encode a grayscale raster as PNG bytes.
///
/// # Errors
///
/// Returns [`SketchError::ImageEncode`] if the encoder fails.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, SketchError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::L8,
        )
        .map_err(|e| SketchError::ImageEncode(e.to_string()))?;
    Ok(png_bytes)
}
