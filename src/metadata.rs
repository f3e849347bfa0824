//! SEO and social metadata resolution.
//!
//! Every page gets a [`PageMeta`] built from the first available source:
//!
//! 1. the page's own `siteMetadata` relation,
//! 2. the CMS site metadata entry named "Default",
//! 3. the `[site]` defaults from `config.toml`.
//!
//! Within the chosen source, Open Graph and Twitter fields cascade back to
//! the plain meta fields (`twitterTitle` → `ogTitle` → `metaTitle`). When no
//! share image is configured, pages point at their own screenshot served by
//! `/api/og`.

use crate::cms::media_url;
use crate::config::SiteConfig;
use crate::types::{Media, SiteMetadata};

pub const DEFAULT_OG_TYPE: &str = "website";
pub const DEFAULT_TWITTER_CARD: &str = "summary_large_image";
pub const OG_IMAGE_WIDTH: u32 = 1200;
pub const OG_IMAGE_HEIGHT: u32 = 630;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenGraph {
    pub title: Option<String>,
    pub description: Option<String>,
    pub og_type: String,
    pub locale: String,
    pub site_name: Option<String>,
    pub image: Option<ShareImage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Twitter {
    pub card: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site: Option<String>,
    pub creator: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icons {
    pub icon: Option<String>,
    pub apple: Option<String>,
}

/// Everything that ends up in a page's `<head>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    /// Final `<title>`, template already applied.
    pub title: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub robots: Option<String>,
    pub canonical: Option<String>,
    pub theme_color: Option<String>,
    pub open_graph: OpenGraph,
    pub twitter: Twitter,
    pub icons: Icons,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn first_of(values: &[&Option<String>]) -> Option<String> {
    values.iter().find_map(|v| non_empty(v))
}

fn resolved_url(media: Option<&Media>, config: &SiteConfig) -> Option<String> {
    media
        .map(|m| media_url(&m.url, &config.cms))
        .filter(|u| !u.is_empty())
}

/// A media field that carries a URL at all.
fn explicit(media: Option<&Media>) -> Option<&Media> {
    media.filter(|m| !m.url.trim().is_empty())
}

/// `{site.url}/api/og?slug={path}` for a page path such as `/about`.
pub fn screenshot_url(path: &str, config: &SiteConfig) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!(
        "{}/api/og?slug={}",
        config.site.url.trim_end_matches('/'),
        encoded
    )
}

/// Resolve head metadata for a page.
///
/// `path` is the page's URL path (`/`, `/about`); without it no screenshot
/// fallback is offered (the 404 page, error pages).
pub fn build_metadata(
    page_meta: Option<&SiteMetadata>,
    default_meta: Option<&SiteMetadata>,
    path: Option<&str>,
    config: &SiteConfig,
) -> PageMeta {
    match page_meta.or(default_meta) {
        Some(meta) => from_cms(meta, path, config),
        None => site_defaults(path, config),
    }
}

fn page_title(meta_title: Option<&str>, config: &SiteConfig) -> String {
    match meta_title {
        Some(title) => config.site.title_template.replace("%s", title),
        None => config.site.default_title.clone(),
    }
}

fn from_cms(meta: &SiteMetadata, path: Option<&str>, config: &SiteConfig) -> PageMeta {
    let meta_title = non_empty(&meta.meta_title);
    let screenshot = path.map(|p| screenshot_url(p, config));

    // An explicit image always wins, even when its host is blocked and it
    // resolves to nothing; the screenshot only stands in for a missing one.
    let og_image = match explicit(meta.og_image.as_ref()) {
        Some(media) => resolved_url(Some(media), config).map(|url| ShareImage {
            url,
            width: media.width.unwrap_or(OG_IMAGE_WIDTH),
            height: media.height.unwrap_or(OG_IMAGE_HEIGHT),
            alt: non_empty(&media.alternative_text)
                .or_else(|| meta_title.clone())
                .unwrap_or_else(|| "Open Graph Image".to_string()),
        }),
        None => screenshot.clone().map(|url| ShareImage {
            url,
            width: OG_IMAGE_WIDTH,
            height: OG_IMAGE_HEIGHT,
            alt: meta_title
                .clone()
                .unwrap_or_else(|| "Page Screenshot".to_string()),
        }),
    };

    let twitter_image = match explicit(meta.twitter_image.as_ref()) {
        Some(media) => resolved_url(Some(media), config),
        None => screenshot,
    };

    PageMeta {
        title: page_title(meta_title.as_deref(), config),
        description: non_empty(&meta.meta_description),
        keywords: meta
            .keywords
            .as_deref()
            .map(|k| {
                k.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        robots: non_empty(&meta.robots),
        canonical: non_empty(&meta.canonical_url),
        theme_color: non_empty(&meta.theme_color),
        open_graph: OpenGraph {
            title: first_of(&[&meta.og_title, &meta.meta_title]),
            description: first_of(&[&meta.og_description, &meta.meta_description]),
            og_type: non_empty(&meta.og_type).unwrap_or_else(|| DEFAULT_OG_TYPE.to_string()),
            locale: non_empty(&meta.og_locale).unwrap_or_else(|| config.site.locale.clone()),
            site_name: non_empty(&meta.og_site_name),
            image: og_image,
        },
        twitter: Twitter {
            card: non_empty(&meta.twitter_card)
                .unwrap_or_else(|| DEFAULT_TWITTER_CARD.to_string()),
            title: first_of(&[&meta.twitter_title, &meta.og_title, &meta.meta_title]),
            description: first_of(&[
                &meta.twitter_description,
                &meta.og_description,
                &meta.meta_description,
            ]),
            site: non_empty(&meta.twitter_site),
            creator: non_empty(&meta.twitter_creator),
            image: twitter_image,
        },
        icons: Icons {
            icon: resolved_url(meta.favicon.as_ref(), config),
            apple: resolved_url(meta.apple_touch_icon.as_ref(), config),
        },
    }
}

fn site_defaults(path: Option<&str>, config: &SiteConfig) -> PageMeta {
    let screenshot = path.map(|p| screenshot_url(p, config));
    PageMeta {
        title: config.site.default_title.clone(),
        description: Some(config.site.description.clone()),
        keywords: Vec::new(),
        robots: None,
        canonical: None,
        theme_color: None,
        open_graph: OpenGraph {
            title: Some(config.site.default_title.clone()),
            description: Some(config.site.description.clone()),
            og_type: DEFAULT_OG_TYPE.to_string(),
            locale: config.site.locale.clone(),
            site_name: None,
            image: screenshot.clone().map(|url| ShareImage {
                url,
                width: OG_IMAGE_WIDTH,
                height: OG_IMAGE_HEIGHT,
                alt: config.site.default_title.clone(),
            }),
        },
        twitter: Twitter {
            card: DEFAULT_TWITTER_CARD.to_string(),
            title: Some(config.site.default_title.clone()),
            description: Some(config.site.description.clone()),
            site: None,
            creator: None,
            image: screenshot,
        },
        icons: Icons::default(),
    }
}
