//! Shared test utilities for the schoolsite test suite.
//!
//! Provides an in-memory CMS ([`MockSource`]), a fake browser
//! ([`MockScreenshotter`]), and fixture loaders.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = MockSource::new()
//!     .with_page(page_with_slug("/"))
//!     .with_page(page_with_slug("about"))
//!     .failing_page("about");
//!
//! let snapshot = fetch(&source).unwrap();
//! ```

use crate::cms::{CmsError, ContentSource};
use crate::fetch::Snapshot;
use crate::og::{OgError, Screenshotter};
use crate::types::{
    CustomCss, NavigationCategory, NotFoundPage, Page, SiteMetadata, SlugEntry,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =========================================================================
// Fixtures
// =========================================================================

/// A minimal page with the given slug and a fixed update time.
pub fn page_with_slug(slug: &str) -> Page {
    Page {
        id: 1,
        slug: slug.to_string(),
        updated_at: Some("2024-01-01T00:00:00.000Z".to_string()),
        ..Default::default()
    }
}

/// Load `fixtures/snapshot.json`: a home page using every component type,
/// a legacy-group page, a failed page, navigation, custom CSS and a 404 page.
pub fn fixture_snapshot() -> Snapshot {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/snapshot.json");
    Snapshot::load(&path).unwrap_or_else(|e| panic!("fixture snapshot: {e}"))
}

/// An in-memory PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn unavailable(url: &str) -> CmsError {
    CmsError::Status {
        url: url.to_string(),
        status: 503,
    }
}

// =========================================================================
// MockSource
// =========================================================================

/// In-memory [`ContentSource`].
///
/// Pages are listed in insertion order; home (`/`) is never listed, matching
/// the CMS slug listing.
#[derive(Default)]
pub struct MockSource {
    pages: Vec<Page>,
    failing_pages: BTreeSet<String>,
    failing_slugs: bool,
    failing_site_data: bool,
    navigation: Vec<NavigationCategory>,
    default_metadata: Option<SiteMetadata>,
    custom_css: Vec<CustomCss>,
    not_found: Option<NotFoundPage>,
    media: BTreeMap<String, Vec<u8>>,
    media_requests: AtomicUsize,
    page_requests: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    /// Fetching this slug fails; it is still listed.
    pub fn failing_page(mut self, slug: &str) -> Self {
        self.failing_pages.insert(slug.to_string());
        self
    }

    pub fn failing_slugs(mut self) -> Self {
        self.failing_slugs = true;
        self
    }

    /// Navigation, default metadata, custom CSS and the 404 page all fail.
    pub fn failing_site_data(mut self) -> Self {
        self.failing_site_data = true;
        self
    }

    pub fn with_navigation(mut self, navigation: Vec<NavigationCategory>) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn with_default_metadata(mut self, metadata: SiteMetadata) -> Self {
        self.default_metadata = Some(metadata);
        self
    }

    pub fn with_custom_css(mut self, css: Vec<CustomCss>) -> Self {
        self.custom_css = css;
        self
    }

    pub fn with_not_found(mut self, page: NotFoundPage) -> Self {
        self.not_found = Some(page);
        self
    }

    /// Serve `bytes` for the resolved media `url`.
    pub fn with_media(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.media.insert(url.to_string(), bytes);
        self
    }

    /// Number of `fetch_media` calls so far, hits and misses.
    pub fn media_requests(&self) -> usize {
        self.media_requests.load(Ordering::SeqCst)
    }

    /// Slugs passed to `fetch_page_by_slug`, in call order.
    pub fn page_requests(&self) -> Vec<String> {
        self.page_requests.lock().unwrap().clone()
    }

    fn site_data<T: Clone>(&self, what: &str, value: &T) -> Result<T, CmsError> {
        if self.failing_site_data {
            Err(unavailable(what))
        } else {
            Ok(value.clone())
        }
    }
}

impl ContentSource for MockSource {
    fn fetch_page_by_slug(&self, slug: &str) -> Result<Option<Page>, CmsError> {
        self.page_requests.lock().unwrap().push(slug.to_string());
        if self.failing_pages.contains(slug) {
            return Err(unavailable(slug));
        }
        Ok(self.pages.iter().find(|p| p.slug == slug).cloned())
    }

    fn fetch_all_slugs_with_dates(&self) -> Result<Vec<SlugEntry>, CmsError> {
        if self.failing_slugs {
            return Err(unavailable("/api/pages"));
        }
        Ok(self
            .pages
            .iter()
            .filter(|p| p.slug != "/")
            .map(|p| SlugEntry {
                slug: p.slug.clone(),
                updated_at: p.updated_at.clone(),
            })
            .collect())
    }

    fn fetch_navigation(&self) -> Result<Vec<NavigationCategory>, CmsError> {
        self.site_data("/api/navigation-categories", &self.navigation)
    }

    fn fetch_default_metadata(&self) -> Result<Option<SiteMetadata>, CmsError> {
        self.site_data("/api/site-metadatas", &self.default_metadata)
    }

    fn fetch_custom_css(&self) -> Result<Vec<CustomCss>, CmsError> {
        self.site_data("/api/custom-csses", &self.custom_css)
    }

    fn fetch_not_found_page(&self) -> Result<Option<NotFoundPage>, CmsError> {
        self.site_data("/api/not-found", &self.not_found)
    }

    fn fetch_media(&self, url: &str) -> Result<Vec<u8>, CmsError> {
        self.media_requests.fetch_add(1, Ordering::SeqCst);
        self.media.get(url).cloned().ok_or_else(|| CmsError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

// =========================================================================
// MockScreenshotter
// =========================================================================

#[derive(Default)]
struct ShotState {
    urls: Mutex<Vec<String>>,
}

/// Fake browser returning a small PNG and recording every requested URL.
///
/// Clones share their recorded URLs, so a test can keep one handle and hand
/// another to the cache.
#[derive(Clone, Default)]
pub struct MockScreenshotter {
    state: Arc<ShotState>,
    fail_all: bool,
    fail_url: Option<String>,
    delay: Option<Duration>,
}

impl MockScreenshotter {
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, url: &str) -> Self {
        self.fail_url = Some(url.to_string());
        self
    }

    /// Sleep this long inside every capture.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every URL passed to `capture`, in call order.
    pub fn urls(&self) -> Vec<String> {
        self.state.urls.lock().unwrap().clone()
    }
}

impl Screenshotter for MockScreenshotter {
    fn capture(&self, url: &str) -> Result<Vec<u8>, OgError> {
        self.state.urls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_all || self.fail_url.as_deref() == Some(url) {
            return Err(OgError::Capture {
                url: url.to_string(),
                reason: "mock failure".to_string(),
            });
        }
        Ok(png_bytes(12, 6))
    }
}
