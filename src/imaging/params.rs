//! Parameter types for placeholder generation.
//!
//! These describe *what* to produce. [`BlurParams::params_hash`] feeds the
//! blur cache so a config change invalidates previously generated
//! placeholders.

use crate::config::ImagesConfig;
use sha2::{Digest, Sha256};

/// Quality setting for lossy JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(20)
    }
}

/// Square placeholder edge and JPEG quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurParams {
    pub size: u32,
    pub quality: Quality,
}

impl BlurParams {
    pub fn from_config(images: &ImagesConfig) -> Self {
        Self {
            size: images.blur_size.max(1),
            quality: Quality::new(images.blur_quality),
        }
    }

    /// SHA-256 of the parameters, hex encoded.
    pub fn params_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"blur\0");
        hasher.update(self.size.to_le_bytes());
        hasher.update([self.quality.value()]);
        format!("{:x}", hasher.finalize())
    }
}

impl Default for BlurParams {
    fn default() -> Self {
        Self::from_config(&ImagesConfig::default())
    }
}
