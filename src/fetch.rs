//! Stage 1: pull everything the site needs out of the CMS.
//!
//! Produces a [`Snapshot`], written as `snapshot.json` into the temp dir.
//! The snapshot is the only input the later stages read, so a build can be
//! re-generated without touching the CMS again.
//!
//! ## Failure handling
//!
//! | Call | On error |
//! |------|----------|
//! | slug listing | fatal, there is nothing to build |
//! | a single page | recorded as [`PageFetch::Failed`], rendered as an error page |
//! | navigation, default metadata, custom CSS, 404 page | logged, treated as empty |

use crate::cms::{CmsError, ContentSource};
use crate::types::{CustomCss, NavigationCategory, NotFoundPage, Page, SiteMetadata, SlugEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Slug of the home page in the CMS.
pub const HOME_SLUG: &str = "/";

pub const SNAPSHOT_FILENAME: &str = "snapshot.json";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to list pages: {0}")]
    SlugListing(#[source] CmsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of fetching one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageFetch {
    Found { page: Box<Page> },
    Missing,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub slug: String,
    pub updated_at: Option<String>,
    pub result: PageFetch,
}

impl FetchedPage {
    pub fn page(&self) -> Option<&Page> {
        match &self.result {
            PageFetch::Found { page } => Some(page),
            _ => None,
        }
    }
}

/// Custom CSS split into site-wide and per-page stylesheets, each in
/// CMS `order`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomCssSet {
    pub global: Vec<CustomCss>,
    pub by_slug: BTreeMap<String, Vec<CustomCss>>,
}

impl CustomCssSet {
    pub fn partition(mut entries: Vec<CustomCss>) -> Self {
        entries.sort_by_key(|e| e.order);
        let mut set = Self::default();
        for entry in entries.into_iter().filter(|e| e.active) {
            match entry.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                Some(slug) => {
                    let key = crate::cms::slug_from_path(slug);
                    set.by_slug.entry(key).or_default().push(entry);
                }
                None => set.global.push(entry),
            }
        }
        set
    }

    pub fn for_slug(&self, slug: &str) -> &[CustomCss] {
        self.by_slug.get(slug).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Everything fetched from the CMS for one build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Home first, then every listed slug in CMS order.
    pub pages: Vec<FetchedPage>,
    pub navigation: Vec<NavigationCategory>,
    pub default_metadata: Option<SiteMetadata>,
    pub custom_css: CustomCssSet,
    pub not_found: NotFoundPage,
    /// RFC 3339 time the snapshot was taken.
    pub fetched_at: String,
}

impl Snapshot {
    pub fn home(&self) -> Option<&FetchedPage> {
        self.pages.iter().find(|p| p.slug == HOME_SLUG)
    }

    /// Listed slugs (home excluded) for the sitemap.
    pub fn slug_entries(&self) -> Vec<SlugEntry> {
        self.pages
            .iter()
            .filter(|p| p.slug != HOME_SLUG)
            .map(|p| SlugEntry {
                slug: p.slug.clone(),
                updated_at: p.updated_at.clone(),
            })
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self, FetchError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), FetchError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn fetch_page(source: &dyn ContentSource, slug: &str, updated_at: Option<String>) -> FetchedPage {
    let result = match source.fetch_page_by_slug(slug) {
        Ok(Some(page)) => PageFetch::Found {
            page: Box::new(page),
        },
        Ok(None) => PageFetch::Missing,
        Err(err) => {
            warn!(slug, "page fetch failed: {err}");
            PageFetch::Failed {
                error: err.to_string(),
            }
        }
    };
    let updated_at = updated_at.or_else(|| match &result {
        PageFetch::Found { page } => page.updated_at.clone(),
        _ => None,
    });
    FetchedPage {
        slug: slug.to_string(),
        updated_at,
        result,
    }
}

/// Log and swallow a non-essential fetch failure.
fn degrade<T: Default>(what: &str, result: Result<T, CmsError>) -> T {
    result.unwrap_or_else(|err| {
        warn!("{what} unavailable, continuing without it: {err}");
        T::default()
    })
}

/// Fetch the home page, every listed page and the site-wide data.
pub fn fetch(source: &dyn ContentSource) -> Result<Snapshot, FetchError> {
    let slugs = source
        .fetch_all_slugs_with_dates()
        .map_err(FetchError::SlugListing)?;
    info!(pages = slugs.len() + 1, "fetching pages");

    let mut pages = Vec::with_capacity(slugs.len() + 1);
    pages.push(fetch_page(source, HOME_SLUG, None));
    for entry in slugs {
        pages.push(fetch_page(source, &entry.slug, entry.updated_at));
    }

    let navigation = degrade("navigation", source.fetch_navigation());
    let default_metadata = degrade("default metadata", source.fetch_default_metadata());
    let custom_css = CustomCssSet::partition(degrade("custom CSS", source.fetch_custom_css()));
    let not_found = degrade("404 page", source.fetch_not_found_page()).unwrap_or_default();

    Ok(Snapshot {
        pages,
        navigation,
        default_metadata,
        custom_css,
        not_found,
        fetched_at: chrono::Utc::now().to_rfc3339(),
    })
}
