//! Raster preprocessing before OCR: greyscale, then a 3×3 sharpen.
//!
//! Photographed or screenshotted pages often carry colour noise and soft
//! glyph edges. Collapsing to luma and sharpening once gives tesseract's
//! binariser a cleaner edge to threshold. Whether this helps depends on the
//! input, so it is a config toggle ([`crate::ConversionConfig::sharpen_images`]).

use image::DynamicImage;

/// Classic sharpen kernel: centre 32, neighbours −2, normalised by its sum (16).
///
/// `image`'s `filter3x3` divides by the kernel sum, so the weights are given
/// un-normalised.
pub const SHARPEN_KERNEL: [f32; 9] = [
    -2.0, -2.0, -2.0, //
    -2.0, 32.0, -2.0, //
    -2.0, -2.0, -2.0,
];

/// Greyscale + sharpen.
pub fn sharpen_for_ocr(img: &DynamicImage) -> DynamicImage {
    img.grayscale().filter3x3(&SHARPEN_KERNEL)
}
