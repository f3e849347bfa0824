//! Blocking Strapi v5 REST client.

use super::{CmsError, ContentSource};
use crate::config::CmsConfig;
use crate::types::{
    CustomCss, NavigationCategory, NotFoundPage, Page, SiteMetadata, SlugEntry, nullable,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Deep populate for a page: header and footer, metadata media, and the
/// full group/section tree both under `pageContent` and the legacy `groups`.
const PAGE_POPULATE: &[(&str, &str)] = &[
    ("populate[header][populate][logo]", "*"),
    ("populate[header][populate][images]", "*"),
    ("populate[footer]", "*"),
    ("populate[siteMetadata][populate][favicon]", "*"),
    ("populate[siteMetadata][populate][ogImage]", "*"),
    ("populate[siteMetadata][populate][twitterImage]", "*"),
    ("populate[siteMetadata][populate][appleTouchIcon]", "*"),
    ("populate[pageContent][populate][groups][populate][content]", "*"),
    (
        "populate[pageContent][populate][groups][populate][sections][populate][content]",
        "*",
    ),
    (
        "populate[pageContent][populate][groups][populate][sections][populate][contentRelation]",
        "*",
    ),
    (
        "populate[pageContent][populate][groups][populate][sections][populate][bgImage]",
        "*",
    ),
    ("populate[pageContent][populate][groups][populate][bgImage]", "*"),
    ("populate[groups][populate][content]", "*"),
    ("populate[groups][populate][sections][populate][content]", "*"),
    ("populate[groups][populate][sections][populate][contentRelation]", "*"),
    ("populate[groups][populate][sections][populate][bgImage]", "*"),
    ("populate[groups][populate][bgImage]", "*"),
];

/// Strapi's `{ data, meta }` response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Default + Deserialize<'de>"))]
struct Envelope<T: Default> {
    #[serde(default, deserialize_with = "nullable")]
    data: T,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    page_count: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlugRow {
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Run `op` up to `max_attempts` times with a fixed `delay` in between.
///
/// Every failure except the last is logged as a warning; the last error is
/// returned as-is.
pub fn with_retry<T, F>(
    max_attempts: u32,
    delay: Duration,
    what: &str,
    mut op: F,
) -> Result<T, CmsError>
where
    F: FnMut() -> Result<T, CmsError>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => return Err(err),
            Err(err) => {
                warn!(
                    "CMS fetch attempt {attempt}/{max_attempts} for {what} failed, retrying in {}ms: {err}",
                    delay.as_millis()
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// [`ContentSource`] backed by a Strapi instance.
#[derive(Debug, Clone)]
pub struct StrapiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    max_attempts: u32,
    retry_delay: Duration,
    page_size: u32,
}

impl StrapiClient {
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            max_attempts: config.max_retries,
            retry_delay: config.retry_delay(),
            page_size: config.page_size,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CmsError> {
        self.get_json_attempts(path, query, self.max_attempts)
    }

    fn get_json_attempts<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        attempts: u32,
    ) -> Result<T, CmsError> {
        let url = format!("{}{}", self.base_url, path);
        with_retry(attempts, self.retry_delay, path, || {
            debug!(%url, "GET");
            let response = self.http.get(&url).query(query).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(CmsError::Status {
                    url: url.clone(),
                    status: status.as_u16(),
                });
            }
            Ok(response.json::<T>()?)
        })
    }
}

fn owned(pairs: &[(&'static str, &str)]) -> Vec<(&'static str, String)> {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

/// Slug and update time of one page, nothing else.
fn slug_entry_query(slug: &str) -> Vec<(&'static str, String)> {
    vec![
        ("filters[slug][$eq]", slug.to_string()),
        ("fields[0]", "slug".to_string()),
        ("fields[1]", "updatedAt".to_string()),
    ]
}

impl ContentSource for StrapiClient {
    fn fetch_page_by_slug(&self, slug: &str) -> Result<Option<Page>, CmsError> {
        let mut query = vec![("filters[slug][$eq]", slug.to_string())];
        query.extend(owned(PAGE_POPULATE));
        let envelope: Envelope<Vec<Page>> = self.get_json("/api/pages", &query)?;
        Ok(envelope.data.into_iter().next())
    }

    fn fetch_all_slugs_with_dates(&self) -> Result<Vec<SlugEntry>, CmsError> {
        let mut entries = Vec::new();
        let mut page = 1u32;
        loop {
            let query = vec![
                ("fields[0]", "slug".to_string()),
                ("fields[1]", "updatedAt".to_string()),
                ("pagination[page]", page.to_string()),
                ("pagination[pageSize]", self.page_size.to_string()),
            ];
            let envelope: Envelope<Vec<SlugRow>> = self.get_json("/api/pages", &query)?;
            entries.extend(envelope.data.into_iter().filter_map(|row| {
                let slug = row.slug.filter(|s| !s.is_empty() && s != "/")?;
                Some(SlugEntry {
                    slug,
                    updated_at: row.updated_at,
                })
            }));

            let page_count = envelope
                .meta
                .and_then(|m| m.pagination)
                .map(|p| p.page_count)
                .unwrap_or(0);
            if page >= page_count {
                break;
            }
            page += 1;
        }
        Ok(entries)
    }

    fn fetch_slug_entry(&self, slug: &str) -> Result<Option<SlugEntry>, CmsError> {
        let query = slug_entry_query(slug);
        let envelope: Envelope<Vec<SlugRow>> = self.get_json_attempts("/api/pages", &query, 1)?;
        Ok(envelope.data.into_iter().next().map(|row| SlugEntry {
            slug: row.slug.unwrap_or_else(|| slug.to_string()),
            updated_at: row.updated_at,
        }))
    }

    fn fetch_navigation(&self) -> Result<Vec<NavigationCategory>, CmsError> {
        let query = owned(&[("populate", "*"), ("sort", "order:asc")]);
        let envelope: Envelope<Vec<NavigationCategory>> =
            self.get_json("/api/navigation-categories", &query)?;
        Ok(envelope.data)
    }

    fn fetch_default_metadata(&self) -> Result<Option<SiteMetadata>, CmsError> {
        let query = owned(&[("populate", "*"), ("filters[name][$eq]", "Default")]);
        let envelope: Envelope<Vec<SiteMetadata>> =
            self.get_json("/api/site-metadatas", &query)?;
        Ok(envelope.data.into_iter().next())
    }

    fn fetch_custom_css(&self) -> Result<Vec<CustomCss>, CmsError> {
        let query = owned(&[("filters[active][$eq]", "true"), ("sort", "order:asc")]);
        let envelope: Envelope<Vec<CustomCss>> = self.get_json("/api/custom-csses", &query)?;
        Ok(envelope.data)
    }

    fn fetch_not_found_page(&self) -> Result<Option<NotFoundPage>, CmsError> {
        let query = owned(&[("populate", "helpfulLinks"), ("populate", "image")]);
        let envelope: Envelope<Option<NotFoundPage>> =
            self.get_json("/api/not-found-page", &query)?;
        Ok(envelope.data)
    }

    fn fetch_media(&self, url: &str) -> Result<Vec<u8>, CmsError> {
        with_retry(self.max_attempts, self.retry_delay, url, || {
            let response = self.http.get(url).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(CmsError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok(response.bytes()?.to_vec())
        })
    }
}
