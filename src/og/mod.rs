//! Open Graph share images, rendered by screenshotting the live page.
//!
//! Pages that have no share image configured point their `og:image` at
//! `/api/og?slug=/about`. The first request for a slug launches a headless
//! browser, captures the top 1200×630 of the rendered page and stores it
//! as `{og.cache_dir}/{key}.png`; later requests read the file back.
//!
//! ## Freshness
//!
//! A cached screenshot is reused while both hold:
//!
//! - its mtime is not older than the page's `updatedAt` in the CMS (when known)
//! - it is younger than `og.max_age_secs` (when set)
//!
//! With `og.max_age_secs` set, an image younger than that is served
//! without asking the CMS at all ([`OgCache::recent`]), so the max age also
//! bounds how long a CMS edit takes to reach the share image.
//!
//! ## Concurrency
//!
//! Rendering holds a process-wide lock, so a burst of requests never starts
//! more than one browser. The freshness check is repeated after the lock
//! is acquired: a request that waited behind a render of the same slug gets
//! that render's file instead of starting another.

mod screenshot;

pub use screenshot::ChromeScreenshotter;

use crate::cms::page_path;
use crate::config::SiteConfig;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum OgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("screenshot of {url} failed: {reason}")]
    Capture { url: String, reason: String },
}

/// Captures a PNG of the top of a web page.
pub trait Screenshotter: Send + Sync {
    fn capture(&self, url: &str) -> Result<Vec<u8>, OgError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OgSource {
    Cached,
    Rendered,
}

#[derive(Debug, Clone)]
pub struct OgImage {
    pub bytes: Vec<u8>,
    pub source: OgSource,
}

/// Cache file stem for a slug: slashes become underscores, empty is `home`.
///
/// `/` → `_`, `/about` → `_about`, `/a/b` → `_a_b`.
pub fn cache_key(slug: &str) -> String {
    let key = slug.replace(['/', '\\'], "_");
    if key.is_empty() { "home".to_string() } else { key }
}

/// Read-through screenshot cache on disk.
pub struct OgCache {
    dir: PathBuf,
    site_url: String,
    max_age: Option<Duration>,
    screenshotter: Box<dyn Screenshotter>,
    render_lock: Mutex<()>,
}

impl OgCache {
    pub fn new(config: &SiteConfig, root: &Path, screenshotter: Box<dyn Screenshotter>) -> Self {
        Self {
            dir: root.join(&config.og.cache_dir),
            site_url: config.site.url.trim_end_matches('/').to_string(),
            max_age: config.og.max_age_secs.map(Duration::from_secs),
            screenshotter,
            render_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file for a page path.
    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.png", cache_key(&page_path(slug))))
    }

    fn is_fresh(&self, path: &Path, updated_at: Option<&str>) -> bool {
        let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) else {
            return false;
        };
        if let Some(max_age) = self.max_age {
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO);
            if age >= max_age {
                return false;
            }
        }
        match updated_at.and_then(|t| DateTime::parse_from_rfc3339(t).ok()) {
            Some(updated) => DateTime::<Utc>::from(modified) >= updated.with_timezone(&Utc),
            None => true,
        }
    }

    fn read_if_fresh(&self, path: &Path, updated_at: Option<&str>) -> Option<OgImage> {
        if !self.is_fresh(path, updated_at) {
            return None;
        }
        let bytes = fs::read(path).ok()?;
        Some(OgImage {
            bytes,
            source: OgSource::Cached,
        })
    }

    /// The stored image when `og.max_age_secs` is set and the file is
    /// younger than that. Needs no CMS lookup.
    pub fn recent(&self, slug: &str) -> Option<OgImage> {
        if self.max_age.is_none() {
            return None;
        }
        self.read_if_fresh(&self.path_for(slug), None)
    }

    /// Whatever is stored for `slug`, however old.
    pub fn stored(&self, slug: &str) -> Option<OgImage> {
        let bytes = fs::read(self.path_for(slug)).ok()?;
        Some(OgImage {
            bytes,
            source: OgSource::Cached,
        })
    }

    /// The share image for `slug` (a page path such as `/about`), from disk
    /// when fresh, otherwise freshly rendered and stored.
    pub fn get_or_render(&self, slug: &str, updated_at: Option<&str>) -> Result<OgImage, OgError> {
        let path = self.path_for(slug);
        if let Some(hit) = self.read_if_fresh(&path, updated_at) {
            debug!(slug, "OG image cache hit");
            return Ok(hit);
        }

        let _guard = self
            .render_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hit) = self.read_if_fresh(&path, updated_at) {
            debug!(slug, "OG image rendered while waiting");
            return Ok(hit);
        }

        let url = format!("{}{}", self.site_url, page_path(slug));
        info!(%url, "rendering OG image");
        let bytes = self.screenshotter.capture(&url)?;

        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("png.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &path)?;

        Ok(OgImage {
            bytes,
            source: OgSource::Rendered,
        })
    }
}

/// Outcome of warming the cache for every page.
#[derive(Debug, Default)]
pub struct PrefetchReport {
    pub rendered: Vec<String>,
    pub cached: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl PrefetchReport {
    pub fn succeeded(&self) -> usize {
        self.rendered.len() + self.cached.len()
    }
}

/// Make sure every page has a share image, one at a time.
///
/// `pages` are `(path, updated_at)` pairs; home should come first.
pub fn prefetch(cache: &OgCache, pages: &[(String, Option<String>)]) -> PrefetchReport {
    let mut report = PrefetchReport::default();
    for (path, updated_at) in pages {
        match cache.get_or_render(path, updated_at.as_deref()) {
            Ok(image) => match image.source {
                OgSource::Cached => report.cached.push(path.clone()),
                OgSource::Rendered => report.rendered.push(path.clone()),
            },
            Err(err) => {
                warn!(%path, "OG prefetch failed: {err}");
                report.failed.push((path.clone(), err.to_string()));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockScreenshotter;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.site.url = "https://schule.test/".into();
        config
    }

    fn cache(tmp: &TempDir, shots: &MockScreenshotter) -> OgCache {
        OgCache::new(&config(), tmp.path(), Box::new(shots.clone()))
    }

    #[test]
    fn cache_keys() {
        assert_eq!(cache_key("/"), "_");
        assert_eq!(cache_key("/about"), "_about");
        assert_eq!(cache_key("/a/b"), "_a_b");
        assert_eq!(cache_key(""), "home");
    }

    #[test]
    fn paths_normalise_bare_slugs() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp, &MockScreenshotter::default());
        assert_eq!(cache.path_for("about"), cache.path_for("/about"));
        assert!(cache.path_for("/").ends_with(".og-cache/_.png"));
    }

    #[test]
    fn first_request_renders_second_hits() {
        let tmp = TempDir::new().unwrap();
        let shots = MockScreenshotter::default();
        let cache = cache(&tmp, &shots);

        let first = cache.get_or_render("/about", None).unwrap();
        assert_eq!(first.source, OgSource::Rendered);
        assert_eq!(shots.urls(), vec!["https://schule.test/about"]);
        assert!(cache.path_for("/about").exists());

        let second = cache.get_or_render("/about", None).unwrap();
        assert_eq!(second.source, OgSource::Cached);
        assert_eq!(second.bytes, first.bytes);
        assert_eq!(shots.urls().len(), 1);
    }

    #[test]
    fn cms_update_after_capture_rerenders() {
        let tmp = TempDir::new().unwrap();
        let shots = MockScreenshotter::default();
        let cache = cache(&tmp, &shots);

        cache.get_or_render("/", None).unwrap();
        let future = (Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
        let again = cache.get_or_render("/", Some(future.as_str())).unwrap();
        assert_eq!(again.source, OgSource::Rendered);

        let past = "2020-01-01T00:00:00.000Z";
        let third = cache.get_or_render("/", Some(past)).unwrap();
        assert_eq!(third.source, OgSource::Cached);
        assert_eq!(shots.urls().len(), 2);
    }

    #[test]
    fn max_age_expires_entries() {
        let tmp = TempDir::new().unwrap();
        let shots = MockScreenshotter::default();
        let mut config = config();
        config.og.max_age_secs = Some(0);
        let cache = OgCache::new(&config, tmp.path(), Box::new(shots.clone()));

        cache.get_or_render("/about", None).unwrap();
        let again = cache.get_or_render("/about", None).unwrap();
        assert_eq!(again.source, OgSource::Rendered);
    }

    #[test]
    fn recent_needs_max_age() {
        let tmp = TempDir::new().unwrap();
        let shots = MockScreenshotter::default();
        let plain = cache(&tmp, &shots);
        plain.get_or_render("/about", None).unwrap();
        assert!(plain.recent("/about").is_none());
        assert!(plain.stored("/about").is_some());

        let mut config = config();
        config.og.max_age_secs = Some(3600);
        let timed = OgCache::new(&config, tmp.path(), Box::new(shots.clone()));
        assert_eq!(timed.recent("/about").unwrap().source, OgSource::Cached);
        assert!(timed.recent("/kontakt").is_none());
        assert!(timed.stored("/kontakt").is_none());
    }

    #[test]
    fn failed_capture_leaves_no_file() {
        let tmp = TempDir::new().unwrap();
        let shots = MockScreenshotter::failing();
        let cache = cache(&tmp, &shots);
        assert!(cache.get_or_render("/about", None).is_err());
        assert!(!cache.path_for("/about").exists());
    }

    #[test]
    fn concurrent_requests_render_once() {
        let tmp = TempDir::new().unwrap();
        let shots = MockScreenshotter::default().with_delay(Duration::from_millis(50));
        let cache = Arc::new(cache(&tmp, &shots));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get_or_render("/kontakt", None).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shots.urls().len(), 1);
    }

    #[test]
    fn prefetch_reports_each_page() {
        let tmp = TempDir::new().unwrap();
        let shots = MockScreenshotter::default().failing_for("https://schule.test/kaputt");
        let cache = cache(&tmp, &shots);
        cache.get_or_render("/", None).unwrap();

        let report = prefetch(
            &cache,
            &[
                ("/".into(), None),
                ("/about".into(), None),
                ("/kaputt".into(), None),
            ],
        );
        assert_eq!(report.cached, vec!["/"]);
        assert_eq!(report.rendered, vec!["/about"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.succeeded(), 2);
    }
}
