//! XML sitemap.
//!
//! One `<url>` for the site root, then one per CMS page. Pages edited
//! recently are advertised with a higher change frequency so crawlers come
//! back sooner.

use crate::types::SlugEntry;
use chrono::{DateTime, Utc};

const ROOT_PRIORITY: &str = "1.0";
const PAGE_PRIORITY: &str = "0.7";

/// Change frequency from the age of the last edit.
///
/// | age | frequency |
/// |---|---|
/// | < 1 day | hourly |
/// | < 7 days | daily |
/// | < 30 days | weekly |
/// | < 180 days | monthly |
/// | older, or unparsable | yearly |
pub fn change_frequency(updated_at: Option<&str>, now: DateTime<Utc>) -> &'static str {
    let Some(updated) = updated_at.and_then(|t| DateTime::parse_from_rfc3339(t).ok()) else {
        return "yearly";
    };
    let days = (now - updated.with_timezone(&Utc)).num_seconds() as f64 / 86_400.0;
    match days {
        d if d < 1.0 => "hourly",
        d if d < 7.0 => "daily",
        d if d < 30.0 => "weekly",
        d if d < 180.0 => "monthly",
        _ => "yearly",
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn url_entry(out: &mut String, loc: &str, lastmod: &str, changefreq: &str, priority: &str) {
    out.push_str(&format!(
        "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{changefreq}</changefreq>\n    <priority>{priority}</priority>\n  </url>\n",
        escape_xml(loc),
        escape_xml(lastmod),
    ));
}

/// Render the sitemap for `base_url` (e.g. `https://schule.de`).
///
/// Pages without a known update time use `now` as `lastmod`.
pub fn render_sitemap(base_url: &str, entries: &[SlugEntry], now: DateTime<Utc>) -> String {
    let base = base_url.trim_end_matches('/');
    let now_str = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    url_entry(&mut out, base, &now_str, "daily", ROOT_PRIORITY);
    for entry in entries {
        let slug = entry.slug.trim_matches('/');
        if slug.is_empty() {
            continue;
        }
        let lastmod = entry.updated_at.as_deref().unwrap_or(&now_str);
        url_entry(
            &mut out,
            &format!("{base}/{slug}"),
            lastmod,
            change_frequency(entry.updated_at.as_deref(), now),
            PAGE_PRIORITY,
        );
    }
    out.push_str("</urlset>\n");
    out
}

/// `https://{domain}` for the sitemap base.
pub fn base_url_for_domain(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}
