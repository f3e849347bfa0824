//! HTML site generation.
//!
//! Stage 3 of the build pipeline. Takes the snapshot from stage 1 and the
//! placeholders from stage 2 and writes the final static site.
//!
//! ## Generated files
//!
//! - **Home** (`/index.html`): the page with slug `/`
//! - **Pages** (`/{slug}/index.html`): one per listed CMS page
//! - **404 page** (`/404.html`): the CMS "not found" entry
//! - **Sitemap** (`/sitemap.xml`): root plus every listed page
//! - **Gallery script** (`/gallery.js`): slider dots and autocycle
//!
//! A page the CMS could not deliver still gets a file: an error card with
//! a retry link when the fetch failed, or a "page not found" card when the
//! CMS has no such entry. A half-broken CMS therefore never breaks links.
//!
//! ## Output structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── 404.html
//! ├── sitemap.xml
//! ├── gallery.js
//! ├── about/
//! │   └── index.html
//! └── kontakt/
//!     └── index.html
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: base styles (colour variables injected from config)
//! - `static/gallery.js`: slider behaviour

use crate::cms::page_path;
use crate::config::{self, SiteConfig};
use crate::fetch::{FetchedPage, PageFetch, Snapshot};
use crate::metadata::{PageMeta, build_metadata};
use crate::process::ProcessedManifest;
use crate::render::{
    ErrorVariant, RenderContext, custom_css_tags, render_document, render_error_display,
    render_footer, render_header, render_not_found, render_page_content,
};
use crate::sitemap::{base_url_for_domain, render_sitemap};
use chrono::{DateTime, Utc};
use maud::{Markup, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const GALLERY_JS: &str = include_str!("../static/gallery.js");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Rendered,
    /// The CMS has no page with this slug.
    NotFound,
    /// The CMS could not be reached for this page.
    Error,
}

#[derive(Debug, Clone)]
pub struct GeneratedPage {
    pub slug: String,
    /// Output file relative to the output directory.
    pub file: String,
    pub status: PageStatus,
}

#[derive(Debug, Default)]
pub struct GenerateResult {
    pub pages: Vec<GeneratedPage>,
    /// Skipped slugs that would escape the output directory.
    pub skipped: Vec<String>,
    pub sitemap_urls: usize,
}

/// Theme CSS: colour variables followed by the base stylesheet.
pub fn site_css(config: &SiteConfig) -> String {
    format!("{}\n\n{}", config::generate_color_css(&config.colors), CSS_STATIC)
}

/// Output file for a slug, relative to the output directory.
///
/// `None` for slugs with `.`/`..` segments or backslashes.
pub fn output_file(slug: &str) -> Option<String> {
    let path = page_path(slug);
    if path == "/" {
        return Some("index.html".to_string());
    }
    let rel = path.trim_start_matches('/');
    let unsafe_segment = rel
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == ".." || seg.contains('\\'));
    (!unsafe_segment).then(|| format!("{rel}/index.html"))
}

fn write_file(output_dir: &Path, rel: &str, contents: &str) -> Result<PathBuf, GenerateError> {
    let path = output_dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path)
}

/// Generate the whole site into `output_dir`.
pub fn generate(
    snapshot: &Snapshot,
    processed: &ProcessedManifest,
    config: &SiteConfig,
    output_dir: &Path,
    now: DateTime<Utc>,
) -> Result<GenerateResult, GenerateError> {
    let css = site_css(config);
    let ctx = RenderContext::new(config, processed, &css);
    fs::create_dir_all(output_dir)?;

    let mut result = GenerateResult::default();
    for fetched in &snapshot.pages {
        let Some(file) = output_file(&fetched.slug) else {
            warn!(slug = %fetched.slug, "slug is not a safe path, skipping");
            result.skipped.push(fetched.slug.clone());
            continue;
        };
        let (markup, status) = render_fetched_page(&ctx, snapshot, fetched);
        write_file(output_dir, &file, &markup.into_string())?;
        result.pages.push(GeneratedPage {
            slug: fetched.slug.clone(),
            file,
            status,
        });
    }

    let not_found = render_not_found_document(&ctx, snapshot);
    write_file(output_dir, "404.html", &not_found.into_string())?;

    let entries: Vec<_> = snapshot
        .slug_entries()
        .into_iter()
        .filter(|e| !result.skipped.contains(&e.slug))
        .collect();
    let sitemap = render_sitemap(&base_url_for_domain(&config.site.domain), &entries, now);
    write_file(output_dir, "sitemap.xml", &sitemap)?;
    result.sitemap_urls = sitemap.matches("<url>").count();

    write_file(output_dir, "gallery.js", GALLERY_JS)?;
    Ok(result)
}

fn noindex(mut meta: PageMeta, title: &str, config: &SiteConfig) -> PageMeta {
    meta.title = config.site.title_template.replace("%s", title);
    meta.robots = Some("noindex".to_string());
    meta
}

/// Render one fetched page as a full document.
pub fn render_fetched_page(
    ctx: &RenderContext<'_>,
    snapshot: &Snapshot,
    fetched: &FetchedPage,
) -> (Markup, PageStatus) {
    let path = page_path(&fetched.slug);
    let custom_css = custom_css_tags(
        &snapshot.custom_css.global,
        Some((fetched.slug.as_str(), snapshot.custom_css.for_slug(&fetched.slug))),
    );
    let defaults = snapshot.default_metadata.as_ref();

    match &fetched.result {
        PageFetch::Found { page } => {
            let meta = build_metadata(
                page.site_metadata.as_ref(),
                defaults,
                Some(path.as_str()),
                ctx.config,
            );
            let body = html! {
                div.page {
                    @if let Some(header) = &page.header {
                        (render_header(ctx, header, &snapshot.navigation))
                    }
                    main.page-main {
                        (render_page_content(ctx, page))
                    }
                    @if let Some(footer) = &page.footer {
                        (render_footer(footer))
                    }
                }
            };
            (render_document(ctx, &meta, custom_css, body), PageStatus::Rendered)
        }
        PageFetch::Missing => {
            let meta = noindex(
                build_metadata(None, defaults, None, ctx.config),
                ErrorVariant::NotFound.default_title(),
                ctx.config,
            );
            let message = format!("The page \"{}\" could not be found.", fetched.slug);
            let body =
                render_error_display(ErrorVariant::NotFound, Some(message.as_str()), None, None);
            (render_document(ctx, &meta, custom_css, body), PageStatus::NotFound)
        }
        PageFetch::Failed { error } => {
            let meta = noindex(
                build_metadata(None, defaults, None, ctx.config),
                ErrorVariant::Error.default_title(),
                ctx.config,
            );
            let body = render_error_display(
                ErrorVariant::Error,
                None,
                Some(error.as_str()),
                Some(path.as_str()),
            );
            (render_document(ctx, &meta, custom_css, body), PageStatus::Error)
        }
    }
}

/// The `404.html` document.
pub fn render_not_found_document(ctx: &RenderContext<'_>, snapshot: &Snapshot) -> Markup {
    let meta = noindex(
        build_metadata(None, snapshot.default_metadata.as_ref(), None, ctx.config),
        &snapshot.not_found.headline,
        ctx.config,
    );
    let custom_css = custom_css_tags(&snapshot.custom_css.global, None);
    render_document(ctx, &meta, custom_css, render_not_found(ctx, &snapshot.not_found))
}
