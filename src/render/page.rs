//! Page content tree: rows, groups, sections and markdown content.

use super::RenderContext;
use super::components::{
    GalleryDisplay, ImageSpec, render_container, render_gallery, render_progressive_image,
    render_teaser, render_triple_tease,
};
use crate::markdown::render_markdown;
use crate::types::{
    ContentEntry, ContentVariant, GroupData, Page, PageComponent, RowData, SectionComponent,
    SectionData,
};
use maud::{Markup, PreEscaped, html};
use tracing::debug;

/// Seconds between slides for galleries placed directly in a section.
pub const GALLERY_AUTOCYCLE_SECS: u32 = 7;

/// Render the body of a page: `pageContent` in order, or the legacy
/// `groups` list when `pageContent` is empty.
pub fn render_page_content(ctx: &RenderContext<'_>, page: &Page) -> Markup {
    if page.page_content.is_empty() {
        return html! {
            @for group in &page.groups {
                (render_group(ctx, group))
            }
        };
    }
    let unknown = page
        .page_content
        .iter()
        .filter(|c| matches!(c, PageComponent::Unknown))
        .count();
    if unknown > 0 {
        debug!(slug = %page.slug, unknown, "skipping unknown page components");
    }
    html! {
        @for component in &page.page_content {
            @match component {
                PageComponent::Row(row) => { (render_row(ctx, row)) },
                PageComponent::Group(group) => { (render_group(ctx, group)) },
                PageComponent::Unknown => {},
            }
        }
    }
}

/// First group two thirds, second group one third, the rest full width.
fn render_row(ctx: &RenderContext<'_>, row: &RowData) -> Markup {
    html! {
        div.row {
            @if let Some(title) = row.title.as_deref().filter(|t| !t.is_empty()) {
                h2.row-title { (title) }
            }
            div.row-groups {
                @for (idx, group) in row.groups.iter().enumerate() {
                    @let width = match idx {
                        0 => "row-col row-col-wide",
                        1 => "row-col row-col-narrow",
                        _ => "row-col row-col-full",
                    };
                    div class=(width) { (render_group(ctx, group)) }
                }
            }
        }
    }
}

fn render_group(ctx: &RenderContext<'_>, group: &GroupData) -> Markup {
    let has_content = !group.content.is_empty();
    let background = group.bg_image.as_ref().filter(|m| !ctx.image_url(&m.url).is_empty());

    html! {
        div.group.group-has-background[background.is_some()] {
            @if let Some(media) = background {
                div.group-background {
                    (render_progressive_image(ctx, &ImageSpec {
                        src: &media.url,
                        alt: "Background",
                        width: None,
                        height: None,
                        class: "group-background-img",
                        eager: false,
                    }))
                }
            }
            div.group-inner {
                @if has_content {
                    div.group-content {
                        @for entry in &group.content {
                            (render_content(entry))
                        }
                    }
                }
                @for section in &group.sections {
                    (render_section(ctx, section, section.inline.unwrap_or(has_content)))
                }
            }
        }
    }
}

/// Only colour-ish characters survive into a `style` attribute.
fn css_color(value: &str) -> Option<&str> {
    let value = value.trim();
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' '));
    safe.then_some(value)
}

fn section_style(ctx: &RenderContext<'_>, section: &SectionData) -> Option<String> {
    let mut style = String::new();
    if let Some(color) = section.background_color().and_then(css_color) {
        style.push_str(&format!("background-color:{color};"));
    }
    if let Some(media) = &section.bg_image {
        let url = ctx.image_url(&media.url);
        if !url.is_empty() {
            let url = url.replace(['"', '\\'], "");
            style.push_str(&format!(
                r#"background-image:url("{url}");background-size:cover;background-position:center;"#
            ));
        }
    }
    (!style.is_empty()).then_some(style)
}

/// A section: content relations first, then its components.
///
/// A gallery that opens a standalone (non-inline) section fills the
/// viewport; every other gallery sits inline. Both cycle every
/// [`GALLERY_AUTOCYCLE_SECS`].
pub fn render_section(ctx: &RenderContext<'_>, section: &SectionData, inline: bool) -> Markup {
    let style = section_style(ctx, section);
    if section.content.iter().any(|c| matches!(c, SectionComponent::Unknown)) {
        debug!("skipping unknown section components");
    }
    let class = format!(
        "section {}{}",
        if inline { "section-inline" } else { "section-standalone" },
        if style.is_none() { " section-plain" } else { "" }
    );

    html! {
        div class=(class) style=[style] {
            @if !section.content_relation.is_empty() {
                div.section-content {
                    @for entry in &section.content_relation {
                        (render_content(entry))
                    }
                }
            }
            @for (idx, component) in section.content.iter().enumerate() {
                @match component {
                    SectionComponent::ImageGallery(gallery) => {
                        @let display = if !inline && idx == 0 {
                            GalleryDisplay::Fullscreen
                        } else {
                            GalleryDisplay::Inline
                        };
                        (render_gallery(ctx, gallery, display, Some(GALLERY_AUTOCYCLE_SECS)))
                    },
                    SectionComponent::Teaser(teaser) => { (render_teaser(ctx, teaser)) },
                    SectionComponent::TripleTease(triple) => { (render_triple_tease(ctx, triple)) },
                    SectionComponent::Container(container) => { (render_container(ctx, container)) },
                    SectionComponent::Unknown => {},
                }
            }
        }
    }
}

/// Markdown block in the `default` or `dark` style.
fn render_content(entry: &ContentEntry) -> Markup {
    let class = match entry.variant() {
        ContentVariant::Default => "content content-default",
        ContentVariant::Dark => "content content-dark",
    };
    html! {
        div class=(class) {
            div.content-body { (PreEscaped(render_markdown(&entry.content))) }
        }
    }
}
