//! # Thumbnail generation.
//!
//! Extracted images are shipped to the presentation layer as small previews:
//! decode, scale proportionally to a target width with nearest-neighbor
//! resampling, re-encode in the same format.  Formats outside the allow-list
//! produce no thumbnail at all, which the pipeline treats as "skip this
//! attachment", not as a failure.

use std::io::Cursor;

use anyhow::{Context as _, Result};
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader};

/// Formats (MIME subtypes) we re-encode thumbnails in.
pub const SUPPORTED_FORMATS: &[&str] = &["jpeg", "png", "gif"];

fn output_format(subtype: &str) -> Option<ImageFormat> {
    match subtype {
        "jpeg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        "gif" => Some(ImageFormat::Gif),
        _ => None,
    }
}

/// Scales `bytes` down to `target_width`, preserving the aspect ratio.
///
/// Returns `Ok(None)` when the part of `mime_type` after the `/` is not in
/// `supported`.  Decode failures are real errors, but they are local to one
/// attachment; callers absorb them into a skip.
pub fn resize(
    bytes: &[u8],
    mime_type: &str,
    target_width: u32,
    supported: &[&str],
) -> Result<Option<Vec<u8>>> {
    let subtype = mime_type.split('/').nth(1).unwrap_or_default();
    if !supported.contains(&subtype) {
        return Ok(None);
    }
    let format = match output_format(subtype) {
        Some(format) => format,
        None => return Ok(None),
    };

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
        .context("image decode failure")?;

    let scale = target_width as f64 / img.width() as f64;
    let target_height = ((img.height() as f64 * scale) as u32).max(1);
    let scaled = img.resize_exact(target_width, target_height, FilterType::Nearest);

    let mut buf = Cursor::new(Vec::new());
    scaled
        .write_to(&mut buf, format)
        .context("thumbnail encode failure")?;
    Ok(Some(buf.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_gif, test_jpeg, test_png};

    #[test]
    fn test_resize_preserves_aspect_ratio() {
        let png = test_png(60, 30);
        let thumb = resize(&png, "image/png", 20, SUPPORTED_FORMATS)
            .unwrap()
            .unwrap();

        let img = image::load_from_memory(&thumb).unwrap();
        assert_eq!(img.width(), 20);
        assert_eq!(img.height(), 10);

        // still a PNG
        assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_resize_upscales_too() {
        let gif = test_gif(4, 8);
        let thumb = resize(&gif, "image/gif", 16, SUPPORTED_FORMATS)
            .unwrap()
            .unwrap();

        let img = image::load_from_memory(&thumb).unwrap();
        assert_eq!((img.width(), img.height()), (16, 32));
    }

    #[test]
    fn test_resize_keeps_jpeg_format() {
        let jpeg = test_jpeg(32, 32);
        let thumb = resize(&jpeg, "image/jpeg", 8, SUPPORTED_FORMATS)
            .unwrap()
            .unwrap();
        assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_unsupported_format_yields_none() {
        let png = test_png(10, 10);
        assert_eq!(resize(&png, "image/png", 5, &["gif"]).unwrap(), None);
        assert_eq!(
            resize(b"%PDF-1.4", "application/pdf", 5, SUPPORTED_FORMATS).unwrap(),
            None
        );
    }

    #[test]
    fn test_garbage_bytes_error() {
        assert!(resize(b"not an image", "image/png", 5, SUPPORTED_FORMATS).is_err());
    }

    #[test]
    fn test_tiny_target_height_clamped() {
        let png = test_png(100, 1);
        let thumb = resize(&png, "image/png", 10, SUPPORTED_FORMATS)
            .unwrap()
            .unwrap();
        let img = image::load_from_memory(&thumb).unwrap();
        assert_eq!((img.width(), img.height()), (10, 1));
    }
}
