//! Blur placeholder encoding.

use super::params::BlurParams;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlurError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode placeholder: {0}")]
    Encode(#[source] image::ImageError),
}

/// Whether a URL points at an SVG (by extension, ignoring query and case).
pub fn is_svg(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".svg")
}

/// Decode `bytes`, cover-crop to `size`×`size`, re-encode as a low quality
/// JPEG and return it as a `data:` URL.
pub fn blur_data_url(bytes: &[u8], params: &BlurParams) -> Result<String, BlurError> {
    let img = image::load_from_memory(bytes).map_err(BlurError::Decode)?;
    let filled = img
        .resize_to_fill(params.size, params.size, FilterType::Triangle)
        .to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, params.quality.value())
        .write_image(
            filled.as_raw(),
            filled.width(),
            filled.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(BlurError::Encode)?;

    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn decode_data_url(url: &str) -> DynamicImage {
        let b64 = url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let bytes = STANDARD.decode(b64).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn produces_square_jpeg_data_url() {
        let url = blur_data_url(&png_bytes(120, 80), &BlurParams::default()).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        let img = decode_data_url(&url);
        assert_eq!((img.width(), img.height()), (8, 8));
    }

    #[test]
    fn honours_custom_size() {
        let params = BlurParams {
            size: 4,
            quality: Quality::new(50),
        };
        let img = decode_data_url(&blur_data_url(&png_bytes(30, 90), &params).unwrap());
        assert_eq!((img.width(), img.height()), (4, 4));
    }

    #[test]
    fn placeholder_is_tiny() {
        let url = blur_data_url(&png_bytes(1200, 800), &BlurParams::default()).unwrap();
        assert!(url.len() < 2048, "placeholder too large: {} bytes", url.len());
    }

    #[test]
    fn garbage_input_is_a_decode_error() {
        let result = blur_data_url(b"not an image", &BlurParams::default());
        assert!(matches!(result, Err(BlurError::Decode(_))));
    }

    #[test]
    fn svg_detection_ignores_case_and_query() {
        assert!(is_svg("/uploads/logo.svg"));
        assert!(is_svg("https://cms/uploads/LOGO.SVG?v=2"));
        assert!(!is_svg("/uploads/photo.jpg"));
        assert!(!is_svg("/uploads/svg-photo.png"));
    }
}
