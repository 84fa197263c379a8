//! Image encoding: `DynamicImage` → PNG bytes for the OCR engine.
//!
//! PNG is lossless, so the glyph edges tesseract thresholds on are exactly
//! the ones the renderer (or the sharpen pass) produced. JPEG ringing around
//! text measurably hurts recognition at 200 DPI.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a page image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}
