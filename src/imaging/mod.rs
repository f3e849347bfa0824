//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` (JPEG, PNG, GIF, WebP) |
//! | **Cover crop** | `image::DynamicImage::resize_to_fill` |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder` |
//! | **Data URL** | `base64` standard engine |
//!
//! The only product is the blur placeholder: a tiny, heavily compressed
//! preview shown while the real image loads.

mod blur;
mod params;

pub use blur::{BlurError, blur_data_url, is_svg};
pub use params::{BlurParams, Quality};
