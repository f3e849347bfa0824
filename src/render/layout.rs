//! Document shell: `<head>` metadata, stylesheets and scripts.

use super::RenderContext;
use crate::metadata::PageMeta;
use crate::types::CustomCss;
use maud::{DOCTYPE, Markup, PreEscaped, html};

/// Path of the gallery script written next to the pages.
pub const GALLERY_SCRIPT: &str = "/gallery.js";

/// Keep editor CSS from closing its `<style>` element early.
fn style_text(css: &str) -> PreEscaped<String> {
    PreEscaped(css.replace("</", "<\\/"))
}

fn joined(entries: &[CustomCss]) -> String {
    entries
        .iter()
        .map(|entry| format!("/* {} */\n{}", entry.name.replace("*/", "* /"), entry.css))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `<style>` elements for editor-managed CSS.
///
/// Global stylesheets go into one `data-custom-css="global"` element; without
/// any, a link to `/custom.css` is emitted instead so a hand-deployed file
/// still applies. Page stylesheets are emitted only when there are some.
pub fn custom_css_tags(global: &[CustomCss], page: Option<(&str, &[CustomCss])>) -> Markup {
    html! {
        @if global.is_empty() {
            link rel="stylesheet" href="/custom.css" data-custom-css-fallback="true";
        } @else {
            style data-custom-css="global" { (style_text(&joined(global))) }
        }
        @if let Some((slug, entries)) = page.filter(|(_, e)| !e.is_empty()) {
            style data-custom-css=(slug) { (style_text(&joined(entries))) }
        }
    }
}

fn head(ctx: &RenderContext<'_>, meta: &PageMeta, custom_css: Markup) -> Markup {
    let og = &meta.open_graph;
    let twitter = &meta.twitter;
    html! {
        head {
            meta charset="UTF-8";
            meta name="viewport" content="width=device-width, initial-scale=1.0";
            title { (meta.title) }
            @if let Some(description) = &meta.description {
                meta name="description" content=(description);
            }
            @if !meta.keywords.is_empty() {
                meta name="keywords" content=(meta.keywords.join(", "));
            }
            @if let Some(robots) = &meta.robots {
                meta name="robots" content=(robots);
            }
            @if let Some(canonical) = &meta.canonical {
                link rel="canonical" href=(canonical);
            }
            @if let Some(color) = &meta.theme_color {
                meta name="theme-color" content=(color);
            }

            @if let Some(title) = &og.title {
                meta property="og:title" content=(title);
            }
            @if let Some(description) = &og.description {
                meta property="og:description" content=(description);
            }
            meta property="og:type" content=(og.og_type);
            meta property="og:locale" content=(og.locale);
            @if let Some(name) = &og.site_name {
                meta property="og:site_name" content=(name);
            }
            @if let Some(image) = &og.image {
                meta property="og:image" content=(image.url);
                meta property="og:image:width" content=(image.width);
                meta property="og:image:height" content=(image.height);
                meta property="og:image:alt" content=(image.alt);
            }

            meta name="twitter:card" content=(twitter.card);
            @if let Some(title) = &twitter.title {
                meta name="twitter:title" content=(title);
            }
            @if let Some(description) = &twitter.description {
                meta name="twitter:description" content=(description);
            }
            @if let Some(site) = &twitter.site {
                meta name="twitter:site" content=(site);
            }
            @if let Some(creator) = &twitter.creator {
                meta name="twitter:creator" content=(creator);
            }
            @if let Some(image) = &twitter.image {
                meta name="twitter:image" content=(image);
            }

            @if let Some(icon) = &meta.icons.icon {
                link rel="icon" href=(icon);
            }
            @if let Some(apple) = &meta.icons.apple {
                link rel="apple-touch-icon" href=(apple);
            }

            @if let (Some(src), Some(id)) = (&ctx.config.site.analytics_script, &ctx.config.site.analytics_website_id) {
                script defer src=(src) data-website-id=(id) {}
            }
            style { (style_text(ctx.css)) }
            (custom_css)
            script defer src=(GALLERY_SCRIPT) {}
        }
    }
}

/// Full HTML document around `body`.
pub fn render_document(
    ctx: &RenderContext<'_>,
    meta: &PageMeta,
    custom_css: Markup,
    body: Markup,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(ctx.config.site.lang) {
            (head(ctx, meta, custom_css))
            body {
                (body)
            }
        }
    }
}
