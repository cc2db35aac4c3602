//! Decode, downscale and re-encode as JPEG.

use std::io::Cursor;

use heritrail_config::VariantWidths;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, ImageReader, Limits, Rgb, RgbImage};
use serde::Serialize;

use crate::error::{MediaError, Result};

#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// One named gallery size.
#[derive(Debug, Clone, Serialize)]
pub struct ImageVariant {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ImageVariant {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Largest width or height accepted from a source image.
pub const MAX_SOURCE_DIMENSION: u32 = 12_000;
/// Decoder allocation cap.
const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    decode_within(bytes, MAX_SOURCE_DIMENSION)
}

/// Decode, refusing images whose header declares a side over `max_dimension`
/// before any pixel buffer is allocated.
pub fn decode_within(bytes: &[u8], max_dimension: u32) -> Result<DynamicImage> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(max_dimension);
    limits.max_image_height = Some(max_dimension);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::Decode(e.to_string()))?;
    reader.limits(limits);
    reader.decode().map_err(|e| match e {
        ImageError::Limits(_) => MediaError::Decode(format!(
            "image dimensions exceed {max_dimension}x{max_dimension} pixels"
        )),
        other => MediaError::Decode(other.to_string()),
    })
}

/// Fit within `max_width`, never enlarging.
fn downscale(img: &DynamicImage, max_width: u32) -> DynamicImage {
    if img.width() <= max_width {
        return img.clone();
    }
    img.resize(max_width, u32::MAX, FilterType::Lanczos3)
}

/// Drop alpha by compositing onto white; JPEG has no transparency.
fn flatten(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

fn encode_jpeg(img: &DynamicImage, max_width: u32, quality: u8) -> Result<EncodedImage> {
    let scaled = downscale(img, max_width);
    let rgb = flatten(&scaled);
    let (width, height) = rgb.dimensions();

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(encoder)
        .map_err(|e| MediaError::Encode(e.to_string()))?;

    Ok(EncodedImage { width, height, bytes: buf.into_inner() })
}

/// Decode `bytes`, shrink to at most `max_width` keeping the aspect ratio, and
/// encode as JPEG.
pub fn resize_to_jpeg(bytes: &[u8], max_width: u32, quality: u8) -> Result<EncodedImage> {
    let img = decode(bytes)?;
    encode_jpeg(&img, max_width, quality)
}

/// The three gallery sizes, decoded once.
pub fn gallery_variants(bytes: &[u8], widths: &VariantWidths, quality: u8) -> Result<Vec<ImageVariant>> {
    let img = decode(bytes)?;
    [("thumb", widths.thumb), ("medium", widths.medium), ("large", widths.large)]
        .into_iter()
        .map(|(name, width)| {
            let encoded = encode_jpeg(&img, width, quality)?;
            Ok(ImageVariant {
                name: name.to_string(),
                width: encoded.width,
                height: encoded.height,
                bytes: encoded.bytes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    fn png(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img).write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_downscale_keeps_aspect_ratio() {
        let out = resize_to_jpeg(&png(800, 400, Rgba([200, 10, 10, 255])), 200, 75).unwrap();
        assert_eq!((out.width, out.height), (200, 100));
        assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_never_upscales() {
        let out = resize_to_jpeg(&png(120, 90, Rgba([0, 0, 0, 255])), 2048, 75).unwrap();
        assert_eq!((out.width, out.height), (120, 90));
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let out = resize_to_jpeg(&png(32, 32, Rgba([0, 0, 0, 0])), 64, 90).unwrap();
        let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        let px = decoded.get_pixel(16, 16);
        assert!(px.0.iter().all(|&c| c > 245), "expected white, got {px:?}");
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = resize_to_jpeg(b"definitely not an image", 100, 75).unwrap_err();
        assert!(matches!(err, MediaError::Decode(_)));
    }

    #[test]
    fn test_gallery_variants_sizes() {
        let src = png(1000, 500, Rgba([10, 120, 40, 255]));
        let widths = VariantWidths { thumb: 320, medium: 960, large: 1920 };
        let variants = gallery_variants(&src, &widths, 75).unwrap();

        let dims: Vec<(&str, u32, u32)> =
            variants.iter().map(|v| (v.name.as_str(), v.width, v.height)).collect();
        assert_eq!(dims, vec![("thumb", 320, 160), ("medium", 960, 480), ("large", 1000, 500)]);
        assert!(variants.iter().all(|v| v.size() > 0));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        // Noise defeats JPEG enough for quality to matter
        let mut img = RgbaImage::new(256, 256);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let v = ((x * 31 + y * 17) ^ (x * y)) as u8;
            *px = Rgba([v, v.wrapping_mul(3), v.wrapping_add(91), 255]);
        }
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img).write_to(&mut buf, ImageFormat::Png).unwrap();
        let src = buf.into_inner();

        let low = resize_to_jpeg(&src, 256, 30).unwrap();
        let high = resize_to_jpeg(&src, 256, 95).unwrap();
        assert!(low.bytes.len() < high.bytes.len());
    }

    #[test]
    fn test_oversized_dimensions_are_refused() {
        let err = decode_within(&png(64, 48, Rgba([1, 2, 3, 255])), 32).unwrap_err();
        match err {
            MediaError::Decode(msg) => assert!(msg.contains("32x32"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(decode_within(&png(32, 32, Rgba([1, 2, 3, 255])), 32).is_ok());
    }
}
