//! Stage 2: blur placeholders for every image on the site.
//!
//! Walks the snapshot for image references, resolves them with
//! [`media_url`], and produces a [`ProcessedManifest`] mapping each image
//! URL to a tiny `data:` URL placeholder. The generate stage uses it to
//! paint a blurred preview behind images while they load.
//!
//! ## What is collected
//!
//! - header logo and header image strip
//! - group and section background images
//! - gallery images, teaser images (also inside triple teases and containers)
//! - the 404 page image
//!
//! Empty URLs, blocked hosts and SVGs are dropped; SVGs are vector and do
//! not benefit from a placeholder.
//!
//! ## Parallel processing
//!
//! Images are fetched and encoded in parallel on the global
//! [rayon](https://docs.rs/rayon) pool, sized from `[processing]` in
//! `config.toml`. A failed download or decode skips that image with a
//! warning; it never fails the build.

use crate::cache::{BlurCache, CacheStats};
use crate::cms::{ContentSource, media_url};
use crate::config::CmsConfig;
use crate::fetch::Snapshot;
use crate::imaging::{BlurParams, blur_data_url, is_svg};
use crate::types::{GroupData, Media, PageComponent, SectionComponent, TeaserData};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::warn;

pub const PROCESSED_FILENAME: &str = "processed.json";

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Placeholders keyed by resolved image URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedManifest {
    pub placeholders: BTreeMap<String, String>,
}

impl ProcessedManifest {
    pub fn placeholder(&self, url: &str) -> Option<&str> {
        self.placeholders.get(url).map(String::as_str)
    }

    pub fn load(path: &Path) -> Result<Self, ProcessError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ProcessError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    Cached,
    Generated,
    Skipped(String),
}

/// Progress events for the CLI printer thread.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Started { image_count: usize },
    ImageProcessed { url: String, status: ImageStatus },
}

pub struct ProcessResult {
    pub manifest: ProcessedManifest,
    pub cache_stats: CacheStats,
}

/// Every distinct, resolvable, non-SVG image URL referenced by the snapshot.
pub fn collect_image_urls(snapshot: &Snapshot, cms: &CmsConfig) -> Vec<String> {
    let mut raw: Vec<&str> = Vec::new();

    for fetched in &snapshot.pages {
        let Some(page) = fetched.page() else { continue };
        if let Some(header) = &page.header {
            push_media(&mut raw, header.logo.as_ref());
            for image in &header.images {
                push_media(&mut raw, Some(image));
            }
        }
        for component in &page.page_content {
            match component {
                PageComponent::Row(row) => {
                    for group in &row.groups {
                        collect_group(&mut raw, group);
                    }
                }
                PageComponent::Group(group) => collect_group(&mut raw, group),
                PageComponent::Unknown => {}
            }
        }
        if page.page_content.is_empty() {
            for group in &page.groups {
                collect_group(&mut raw, group);
            }
        }
    }
    push_media(&mut raw, snapshot.not_found.image.as_ref());

    raw.into_iter()
        .map(|url| media_url(url, cms))
        .filter(|url| !url.is_empty() && !is_svg(url))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn push_media<'a>(out: &mut Vec<&'a str>, media: Option<&'a Media>) {
    if let Some(media) = media.filter(|m| !m.url.is_empty()) {
        out.push(&media.url);
    }
}

fn collect_group<'a>(out: &mut Vec<&'a str>, group: &'a GroupData) {
    push_media(out, group.bg_image.as_ref());
    for section in &group.sections {
        push_media(out, section.bg_image.as_ref());
        for component in &section.content {
            collect_component(out, component);
        }
    }
}

fn collect_component<'a>(out: &mut Vec<&'a str>, component: &'a SectionComponent) {
    match component {
        SectionComponent::ImageGallery(gallery) => {
            out.extend(gallery.images.iter().filter_map(|i| i.source()).map(|(url, _)| url));
        }
        SectionComponent::Teaser(teaser) => collect_teaser(out, teaser),
        SectionComponent::TripleTease(triple) => {
            for teaser in &triple.teasers {
                collect_teaser(out, teaser);
            }
        }
        SectionComponent::Container(container) => {
            for child in &container.children {
                collect_component(out, child);
            }
        }
        SectionComponent::Unknown => {}
    }
}

fn collect_teaser<'a>(out: &mut Vec<&'a str>, teaser: &'a TeaserData) {
    push_media(out, teaser.primary_image());
}

/// Generate placeholders for every image in the snapshot.
///
/// With `use_cache`, placeholders from the previous run are reused when the
/// URL and parameters match; the refreshed cache is written back to
/// `temp_dir` either way.
pub fn process(
    source: &dyn ContentSource,
    snapshot: &Snapshot,
    cms: &CmsConfig,
    params: &BlurParams,
    temp_dir: &Path,
    use_cache: bool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let urls = collect_image_urls(snapshot, cms);
    let mut cache = if use_cache {
        BlurCache::load(temp_dir)
    } else {
        BlurCache::empty()
    };

    if let Some(tx) = &progress {
        tx.send(ProcessEvent::Started {
            image_count: urls.len(),
        })
        .ok();
    }

    let outcomes: Vec<(String, ImageStatus, Option<String>)> = urls
        .par_iter()
        .map_with(progress.clone(), |tx, url| {
            let (status, data_url) = match cache.get(url, params) {
                Some(hit) => (ImageStatus::Cached, Some(hit.to_string())),
                None => match generate_placeholder(source, url, params) {
                    Ok(data_url) => (ImageStatus::Generated, Some(data_url)),
                    Err(reason) => {
                        warn!(%url, "no placeholder: {reason}");
                        (ImageStatus::Skipped(reason), None)
                    }
                },
            };
            if let Some(tx) = tx {
                tx.send(ProcessEvent::ImageProcessed {
                    url: url.clone(),
                    status: status.clone(),
                })
                .ok();
            }
            (url.clone(), status, data_url)
        })
        .collect();
    drop(progress);

    let mut stats = CacheStats::default();
    let mut manifest = ProcessedManifest::default();
    for (url, status, data_url) in outcomes {
        match status {
            ImageStatus::Cached => stats.hit(),
            ImageStatus::Generated => stats.miss(),
            ImageStatus::Skipped(_) => stats.skip(),
        }
        if let Some(data_url) = data_url {
            if status == ImageStatus::Generated {
                cache.insert(url.clone(), params, data_url.clone());
            }
            manifest.placeholders.insert(url, data_url);
        }
    }

    cache.retain_urls(&urls);
    cache.save(temp_dir)?;

    Ok(ProcessResult {
        manifest,
        cache_stats: stats,
    })
}

fn generate_placeholder(
    source: &dyn ContentSource,
    url: &str,
    params: &BlurParams,
) -> Result<String, String> {
    let bytes = source.fetch_media(url).map_err(|e| e.to_string())?;
    blur_data_url(&bytes, params).map_err(|e| e.to_string())
}
