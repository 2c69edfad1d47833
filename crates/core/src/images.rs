//! Cover image validation.

use image::ImageFormat;

use crate::error::CoreError;

/// Image formats accepted as track artwork.
const ACCEPTED: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Sniff an uploaded cover image and return its canonical extension.
///
/// Only the header is inspected; the image is not decoded.
pub fn detect_image(bytes: &[u8]) -> Result<&'static str, CoreError> {
    let format = image::guess_format(bytes)
        .map_err(|_| CoreError::Validation("Image must be a JPEG, PNG or WebP file".into()))?;

    if !ACCEPTED.contains(&format) {
        return Err(CoreError::Validation(format!(
            "Unsupported image format {format:?}; expected JPEG, PNG or WebP"
        )));
    }

    Ok(match format {
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        _ => "jpg",
    })
}
