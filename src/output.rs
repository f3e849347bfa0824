//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **content-centric**. Every page leads with its positional index
//! and URL path; what happened to it (fetched, missing, failed, written to
//! which file) follows as secondary context. The output reads as an
//! inventory of the site as the CMS sees it.
//!
//! # Output Format
//!
//! ## Fetch
//!
//! ```text
//! Pages
//! 001 /
//!     Updated: 2024-05-20T08:30:00.000Z
//! 002 /about
//! 003 /termine
//!     Failed: CMS returned status 502
//!
//! Navigation
//! 001 Start
//! 002 Schule (2 entries)
//!
//! Custom CSS: 1 global, 0 page-specific
//! 404 page: Hier geht es nicht weiter
//! ```
//!
//! ## Process
//!
//! ```text
//! Placeholders (12 images)
//!     http://cms.test/uploads/schulhof.jpg: generated
//!     http://cms.test/uploads/logo.png: cached
//! ```
//!
//! ## Generate
//!
//! ```text
//! 001 / → index.html
//! 002 /about → about/index.html
//! 003 /termine → termine/index.html (error page)
//! 404 → 404.html
//! Sitemap → sitemap.xml (3 URLs)
//!
//! Generated 3 pages (1 with errors)
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::cms::page_path;
use crate::config::SiteConfig;
use crate::fetch::{PageFetch, Snapshot};
use crate::generate::{GenerateResult, PageStatus};
use crate::og::PrefetchReport;
use crate::process::{ImageStatus, ProcessEvent};
use crate::types::SlugEntry;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 1: Fetch output
// ============================================================================

/// Format the fetch stage result: pages, navigation and site-wide data.
pub fn format_fetch_output(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for (i, fetched) in snapshot.pages.iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            page_path(&fetched.slug)
        ));
        match &fetched.result {
            PageFetch::Found { .. } => {
                if let Some(updated) = &fetched.updated_at {
                    lines.push(format!("{}Updated: {}", indent(1), updated));
                }
            }
            PageFetch::Missing => lines.push(format!("{}Missing in CMS", indent(1))),
            PageFetch::Failed { error } => lines.push(format!("{}Failed: {}", indent(1), error)),
        }
    }

    if !snapshot.navigation.is_empty() {
        lines.push(String::new());
        lines.push("Navigation".to_string());
        let mut categories: Vec<_> = snapshot.navigation.iter().collect();
        categories.sort_by_key(|c| c.order);
        for (i, category) in categories.iter().enumerate() {
            let entries = category.navigation_entries.len();
            if entries == 0 {
                lines.push(format!("{} {}", format_index(i + 1), category.name));
            } else {
                lines.push(format!(
                    "{} {} ({})",
                    format_index(i + 1),
                    category.name,
                    plural(entries, "entry", "entries")
                ));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Custom CSS: {} global, {} page-specific",
        snapshot.custom_css.global.len(),
        snapshot.custom_css.by_slug.values().map(Vec::len).sum::<usize>()
    ));
    lines.push(format!("404 page: {}", snapshot.not_found.headline));
    lines
}

pub fn print_fetch_output(snapshot: &Snapshot) {
    print_lines(format_fetch_output(snapshot));
}

// ============================================================================
// Stage 2: Process output
// ============================================================================

/// Format a single process progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { image_count } => {
            vec![format!("Placeholders ({})", plural(*image_count, "image", "images"))]
        }
        ProcessEvent::ImageProcessed { url, status } => {
            let status = match status {
                ImageStatus::Cached => "cached".to_string(),
                ImageStatus::Generated => "generated".to_string(),
                ImageStatus::Skipped(reason) => format!("skipped ({reason})"),
            };
            vec![format!("{}{}: {}", indent(1), url, status)]
        }
    }
}

// ============================================================================
// Stage 3: Generate output
// ============================================================================

/// Format generate stage output: each page with its output file.
pub fn format_generate_output(result: &GenerateResult) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, page) in result.pages.iter().enumerate() {
        let note = match page.status {
            PageStatus::Rendered => "",
            PageStatus::NotFound => " (not found page)",
            PageStatus::Error => " (error page)",
        };
        lines.push(format!(
            "{} {} \u{2192} {}{}",
            format_index(i + 1),
            page_path(&page.slug),
            page.file,
            note
        ));
    }
    for slug in &result.skipped {
        lines.push(format!("    Skipped unsafe slug: {slug}"));
    }
    lines.push("404 \u{2192} 404.html".to_string());
    lines.push(format!(
        "Sitemap \u{2192} sitemap.xml ({})",
        plural(result.sitemap_urls, "URL", "URLs")
    ));
    lines.push(String::new());

    let degraded = result
        .pages
        .iter()
        .filter(|p| p.status != PageStatus::Rendered)
        .count();
    let mut summary = format!("Generated {}", plural(result.pages.len(), "page", "pages"));
    if degraded > 0 {
        summary.push_str(&format!(" ({degraded} with errors)"));
    }
    lines.push(summary);
    lines
}

pub fn print_generate_output(result: &GenerateResult) {
    print_lines(format_generate_output(result));
}

// ============================================================================
// OG prefetch output
// ============================================================================

/// Format the `og` command's prefetch report.
pub fn format_og_summary(report: &PrefetchReport) -> Vec<String> {
    let mut lines = Vec::new();
    for path in &report.rendered {
        lines.push(format!("{}{}: rendered", indent(1), path));
    }
    for path in &report.cached {
        lines.push(format!("{}{}: cached", indent(1), path));
    }
    for (path, error) in &report.failed {
        lines.push(format!("{}{}: failed ({})", indent(1), path, error));
    }
    lines.push(format!(
        "OG images: {} succeeded, {} failed",
        report.succeeded(),
        report.failed.len()
    ));
    lines
}

pub fn print_og_summary(report: &PrefetchReport) {
    print_lines(format_og_summary(report));
}

// ============================================================================
// Check output
// ============================================================================

/// Format the `check` command's view of config and CMS reachability.
pub fn format_check_output(config: &SiteConfig, slugs: &[SlugEntry]) -> Vec<String> {
    let mut lines = vec![
        "Config".to_string(),
        format!("{}CMS: {}", indent(1), config.cms.url),
        format!("{}Site: {}", indent(1), config.site.url),
        format!("{}Sitemap domain: {}", indent(1), config.site.domain),
        format!("{}OG cache: {}", indent(1), config.og.cache_dir),
        String::new(),
        format!("CMS lists {}", plural(slugs.len() + 1, "page", "pages")),
    ];
    lines.push(format!("{}{} /", indent(1), format_index(1)));
    for (i, entry) in slugs.iter().enumerate() {
        lines.push(format!(
            "{}{} {}",
            indent(1),
            format_index(i + 2),
            page_path(&entry.slug)
        ));
    }
    lines
}

pub fn print_check_output(config: &SiteConfig, slugs: &[SlugEntry]) {
    print_lines(format_check_output(config, slugs));
}
