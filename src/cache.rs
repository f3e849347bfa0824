//! Blur placeholder cache for incremental builds.
//!
//! Generating a placeholder means downloading the full image from the CMS
//! just to shrink it to 8×8 pixels. This module remembers the result so a
//! rebuild only downloads images it has not seen before.
//!
//! ## Cache keys
//!
//! Entries are keyed by the **resolved image URL**. Strapi upload URLs embed
//! a content hash, so a replaced image gets a new URL and a natural miss.
//!
//! Each entry also stores a **`params_hash`**: SHA-256 of the placeholder
//! size and quality (see [`BlurParams::params_hash`]). Changing either in
//! `config.toml` invalidates every entry.
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<temp_dir>/.blur-cache.json`. A missing,
//! corrupt or wrong-version file loads as an empty cache; so does
//! `--no-cache`.

use crate::imaging::BlurParams;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the temp directory.
const MANIFEST_FILENAME: &str = ".blur-cache.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub params_hash: String,
    pub data_url: String,
}

/// On-disk map of image URL to generated placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlurCache {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl BlurCache {
    /// Create an empty cache (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the temp directory. Returns an empty cache if the file
    /// doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(temp_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(temp_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let cache: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(_) => return Self::empty(),
        };
        if cache.version != MANIFEST_VERSION {
            return Self::empty();
        }
        cache
    }

    /// Save to the temp directory.
    pub fn save(&self, temp_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(temp_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(temp_dir), json)
    }

    /// The cached placeholder for `url`, if it was made with the same params.
    pub fn get(&self, url: &str, params: &BlurParams) -> Option<&str> {
        let entry = self.entries.get(url)?;
        (entry.params_hash == params.params_hash()).then_some(entry.data_url.as_str())
    }

    pub fn insert(&mut self, url: String, params: &BlurParams, data_url: String) {
        self.entries.insert(
            url,
            CacheEntry {
                params_hash: params.params_hash(),
                data_url,
            },
        );
    }

    /// Drop entries for images that are no longer referenced.
    pub fn retain_urls<'a>(&mut self, urls: impl IntoIterator<Item = &'a String>) {
        let keep: std::collections::HashSet<&String> = urls.into_iter().collect();
        self.entries.retain(|url, _| keep.contains(url));
    }
}

/// Summary of cache performance for a process run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    /// Images that could not be fetched or decoded.
    pub skipped: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses + self.skipped
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(f, "{} cached, {} generated", self.hits, self.misses)?;
        } else {
            write!(f, "{} generated", self.misses)?;
        }
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        if self.hits > 0 || self.skipped > 0 {
            write!(f, " ({} total)", self.total())?;
        }
        Ok(())
    }
}

/// Resolve the cache manifest path for a temp directory.
pub fn manifest_path(temp_dir: &Path) -> PathBuf {
    temp_dir.join(MANIFEST_FILENAME)
}
