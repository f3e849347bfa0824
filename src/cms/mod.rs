//! Content source layer.
//!
//! Everything the pipeline knows about the CMS goes through the
//! [`ContentSource`] trait. The production implementation is
//! [`StrapiClient`], a blocking REST client for Strapi v5; tests use
//! `MockSource` from `test_helpers`.
//!
//! ## Slugs and paths
//!
//! Strapi stores page slugs without a leading slash (`about`), except the
//! home page whose slug is `/`. Rendered pages and OG screenshots use URL
//! paths (`/about`). [`page_path`] and [`slug_from_path`] convert between
//! the two.

mod strapi;

pub use strapi::{StrapiClient, with_retry};

use crate::config::CmsConfig;
use crate::types::{CustomCss, NavigationCategory, NotFoundPage, Page, SiteMetadata, SlugEntry};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to the CMS.
///
/// Implementations must be shareable across the rayon pool and the HTTP
/// server's blocking workers.
pub trait ContentSource: Send + Sync {
    /// The page with this slug, or `None` when no entry matches.
    fn fetch_page_by_slug(&self, slug: &str) -> Result<Option<Page>, CmsError>;

    /// Every page slug except home, with its last update timestamp.
    fn fetch_all_slugs_with_dates(&self) -> Result<Vec<SlugEntry>, CmsError>;

    /// The listing entry for one slug (home included), or `None` when the
    /// CMS has no such page.
    ///
    /// Used on request paths, so implementations should answer from a
    /// single lightweight request without retries.
    fn fetch_slug_entry(&self, slug: &str) -> Result<Option<SlugEntry>, CmsError> {
        Ok(self.fetch_page_by_slug(slug)?.map(|page| SlugEntry {
            slug: page.slug,
            updated_at: page.updated_at,
        }))
    }

    /// Navigation categories sorted by `order`.
    fn fetch_navigation(&self) -> Result<Vec<NavigationCategory>, CmsError>;

    /// The site metadata entry named "Default".
    fn fetch_default_metadata(&self) -> Result<Option<SiteMetadata>, CmsError>;

    /// Active custom stylesheets sorted by `order`.
    fn fetch_custom_css(&self) -> Result<Vec<CustomCss>, CmsError>;

    fn fetch_not_found_page(&self) -> Result<Option<NotFoundPage>, CmsError>;

    /// Raw bytes of a media file. `url` is already resolved.
    fn fetch_media(&self, url: &str) -> Result<Vec<u8>, CmsError>;
}

/// Resolve a CMS media URL to something a browser can load.
///
/// Empty or blocked URLs resolve to an empty string, which callers treat
/// as "no image".
pub fn media_url(url: &str, cms: &CmsConfig) -> String {
    let url = url.trim();
    if url.is_empty()
        || cms
            .blocked_media_hosts
            .iter()
            .any(|host| !host.is_empty() && url.contains(host.as_str()))
    {
        return String::new();
    }
    if url.starts_with("http") {
        return url.to_string();
    }
    let base = cms.url.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

/// URL path of a page: `/` for home, `/{slug}` otherwise.
pub fn page_path(slug: &str) -> String {
    let trimmed = slug.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// CMS slug for a URL path: `/` for home, the path without slashes otherwise.
pub fn slug_from_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
