//! # schoolsite
//!
//! A static site builder and small web server for a school website whose
//! content lives in a Strapi CMS. Editors compose pages from rows, groups,
//! sections, galleries and teasers; this crate turns them into plain HTML
//! with blurred image placeholders, a sitemap, and Open Graph share images
//! taken as screenshots of the live pages.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! Content flows through three independent stages, each writing a JSON file
//! into the temp directory that the next stage consumes:
//!
//! ```text
//! 1. Fetch     CMS       →  snapshot.json    (pages, navigation, metadata, CSS, 404)
//! 2. Process   snapshot  →  processed.json   (blur placeholder per image URL)
//! 3. Generate  both      →  dist/            (final HTML site + sitemap)
//! ```
//!
//! A fourth piece, [`serve`], runs alongside the static output: it serves
//! `dist/`, answers `/api/og` with cached page screenshots, and renders the
//! sitemap live from the CMS.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`cms`] | `ContentSource` trait and the blocking Strapi REST client |
//! | [`types`] | CMS data model shared by every stage |
//! | [`fetch`] | Stage 1: pulls everything from the CMS into a snapshot |
//! | [`process`] | Stage 2: blur placeholders for every referenced image |
//! | [`generate`] | Stage 3: writes pages, 404 page, sitemap and script |
//! | [`render`] | maud components for every CMS component type |
//! | [`markdown`] | Markdown to sanitised HTML with contact auto-linking |
//! | [`contact`] | Phone, fax, e-mail and street address detection |
//! | [`metadata`] | `<head>` metadata from page, site default and config |
//! | [`imaging`] | Decoding and encoding of the tiny placeholder JPEGs |
//! | [`cache`] | Placeholder cache that survives between builds |
//! | [`sitemap`] | Sitemap XML with change frequency from edit age |
//! | [`og`] | Screenshot-based share images with an on-disk cache |
//! | [`serve`] | axum server for `dist/`, `/api/og` and `/sitemap.xml` |
//! | [`config`] | `config.toml` loading, validation, env overrides, colour CSS |
//! | [`output`] | CLI output formatting for every command |
//!
//! # Design Decisions
//!
//! ## Degrade, Don't Fail
//!
//! A school website must stay up when the CMS hiccups. Only the slug
//! listing is essential; a page that fails to load becomes an error card
//! with a retry link, and missing navigation or metadata just renders
//! without it. Image placeholders are an enhancement: a failed download
//! skips the placeholder, never the build.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/). Every interpolated
//! string is escaped, which matters here because every string comes from
//! CMS editors. Markdown is rendered with raw HTML disabled.
//!
//! ## Screenshots as Share Images
//!
//! Pages without an editor-supplied share image get one made from the page
//! itself. The first request renders it with headless Chrome; the PNG is
//! kept on disk until the CMS reports a newer edit.

pub mod cache;
pub mod cms;
pub mod config;
pub mod contact;
pub mod fetch;
pub mod generate;
pub mod imaging;
pub mod markdown;
pub mod metadata;
pub mod og;
pub mod output;
pub mod process;
pub mod render;
pub mod serve;
pub mod sitemap;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
