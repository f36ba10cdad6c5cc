//! Client-side image downscaling before upload.
//!
//! Wide images are resized down to a maximum width (keeping aspect ratio)
//! and re-encoded; decode and encode run on a blocking thread.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageFormat};

use super::{FileUpload, MediaError};

/// Default maximum width for compressed product images, in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 1200;

/// Default JPEG encode quality, in `0.0..=1.0`.
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Downscale an image to at most `max_width` pixels wide and re-encode it.
///
/// Narrower images keep their dimensions but are still re-encoded, which
/// normalises oversized source encodings. `quality` applies to JPEG output;
/// PNG and WebP re-encode losslessly. Unrecognised image types come back as
/// PNG with the content type updated to match.
///
/// # Errors
///
/// Returns [`MediaError::NoFile`] for an empty file, [`MediaError::Image`]
/// when the data does not decode or the re-encode fails, and
/// [`MediaError::Task`] when the blocking task is cancelled.
pub async fn compress_image(
    file: &FileUpload,
    max_width: u32,
    quality: f32,
) -> Result<FileUpload, MediaError> {
    if file.is_empty() {
        return Err(MediaError::NoFile);
    }

    let name = file.name.clone();
    let content_type = file.content_type.clone();
    let data = file.data.clone();

    tokio::task::spawn_blocking(move || {
        shrink_and_encode(name, content_type, &data, max_width, quality)
    })
    .await
    .map_err(|e| MediaError::Task(e.to_string()))?
}

fn shrink_and_encode(
    name: String,
    content_type: String,
    data: &[u8],
    max_width: u32,
    quality: f32,
) -> Result<FileUpload, MediaError> {
    let decoded = image::load_from_memory(data)?;
    let (width, height) = (decoded.width(), decoded.height());

    let resized = if width > max_width {
        // Scaled height fits in u32 because it only ever shrinks.
        let scaled_height =
            u32::try_from(u64::from(height) * u64::from(max_width) / u64::from(width))
                .unwrap_or(height)
                .max(1);
        decoded.resize_exact(max_width, scaled_height, FilterType::Triangle)
    } else {
        decoded
    };

    let mut out = Vec::new();
    let mut cursor = Cursor::new(&mut out);
    let mut content_type = content_type;

    match content_type.as_str() {
        "image/jpeg" | "image/jpg" => {
            let rgb = resized.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut cursor, jpeg_quality(quality));
            encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
        }
        "image/webp" => {
            // Lossless encoder; the quality knob applies to JPEG output only.
            let rgba = resized.to_rgba8();
            let encoder = WebPEncoder::new_lossless(&mut cursor);
            encoder.encode(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)?;
        }
        "image/png" => {
            resized.write_to(&mut cursor, ImageFormat::Png)?;
        }
        _ => {
            resized.write_to(&mut cursor, ImageFormat::Png)?;
            content_type = "image/png".to_owned();
        }
    }

    Ok(FileUpload {
        name,
        content_type,
        data: out,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.05, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([10, 20, 30]),
        ));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), format).unwrap();
        out
    }

    #[tokio::test]
    async fn test_compress_shrinks_wide_image() {
        let file = FileUpload::new("wide.png", "image/png", test_image(2400, 1200, ImageFormat::Png));

        let compressed = compress_image(&file, 1200, DEFAULT_QUALITY).await.unwrap();
        assert_eq!(compressed.content_type, "image/png");

        let reloaded = image::load_from_memory(&compressed.data).unwrap();
        assert_eq!(reloaded.width(), 1200);
        assert_eq!(reloaded.height(), 600);
    }

    #[tokio::test]
    async fn test_compress_keeps_narrow_dimensions() {
        let file = FileUpload::new("small.png", "image/png", test_image(300, 200, ImageFormat::Png));

        let compressed = compress_image(&file, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY)
            .await
            .unwrap();

        let reloaded = image::load_from_memory(&compressed.data).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (300, 200));
    }

    #[tokio::test]
    async fn test_compress_reencodes_jpeg() {
        let file = FileUpload::new(
            "photo.jpg",
            "image/jpeg",
            test_image(1600, 900, ImageFormat::Jpeg),
        );

        let compressed = compress_image(&file, 1200, 0.5).await.unwrap();
        assert_eq!(compressed.content_type, "image/jpeg");

        let reloaded = image::load_from_memory(&compressed.data).unwrap();
        assert_eq!(reloaded.width(), 1200);
        assert_eq!(reloaded.height(), 675);
    }

    #[tokio::test]
    async fn test_compress_unknown_type_falls_back_to_png() {
        let file = FileUpload::new("pic.gif", "image/gif", test_image(100, 80, ImageFormat::Png));

        let compressed = compress_image(&file, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY)
            .await
            .unwrap();
        assert_eq!(compressed.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_compress_rejects_empty_file() {
        let file = FileUpload::new("empty.png", "image/png", Vec::new());
        let err = compress_image(&file, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NoFile));
    }

    #[tokio::test]
    async fn test_compress_rejects_garbage_data() {
        let file = FileUpload::new("junk.png", "image/png", vec![1, 2, 3, 4]);
        let err = compress_image(&file, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Image(_)));
    }

    #[test]
    fn test_jpeg_quality_clamps() {
        assert_eq!(jpeg_quality(0.8), 80);
        assert_eq!(jpeg_quality(2.0), 100);
        assert_eq!(jpeg_quality(-1.0), 5);
    }
}
