//! Site header (logo, contact block, image strip, navigation) and footer.

use super::RenderContext;
use super::components::{ImageSpec, render_progressive_image};
use crate::contact::{
    ADDRESS_ICON, ContactKind, EMAIL_ICON, FAX_ICON, LINK_CLASS, PHONE_ICON, detect_contact_type,
};
use crate::types::{FooterData, HeaderData, NavigationCategory, NavigationEntry};
use maud::{Markup, PreEscaped, html};

const CHEVRON: &str = r#"<svg class="nav-chevron" fill="none" stroke="currentColor" viewBox="0 0 24 24" aria-hidden="true"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M19 9l-7 7-7-7"/></svg>"#;

pub fn render_header(
    ctx: &RenderContext<'_>,
    header: &HeaderData,
    navigation: &[NavigationCategory],
) -> Markup {
    let logo = header
        .logo
        .as_ref()
        .map(|logo| (ctx.image_url(&logo.url), logo))
        .filter(|(url, _)| !url.is_empty());

    html! {
        header.site-header {
            div.header-bar {
                div.header-logo {
                    @if let Some((url, logo)) = &logo {
                        a href="/" {
                            img src=(url) alt=(logo.name.as_deref().unwrap_or("Logo"))
                                width="200" height="80";
                        }
                    }
                }
                @if let Some(text) = header.impressum.as_deref().filter(|t| !t.trim().is_empty()) {
                    (render_impressum(text))
                }
            }
            @if !header.images.is_empty() {
                div.header-images {
                    @for (idx, image) in header.images.iter().enumerate() {
                        @let alt = image.name.clone().unwrap_or_else(|| format!("Header image {}", idx + 1));
                        div.header-image {
                            (render_progressive_image(ctx, &ImageSpec {
                                src: &image.url,
                                alt: &alt,
                                width: Some(400),
                                height: Some(210),
                                class: "header-image-img",
                                eager: true,
                            }))
                        }
                    }
                }
            }
            @if !navigation.is_empty() {
                div.header-nav {
                    (render_navigation(navigation))
                }
            }
        }
    }
}

/// Contact block: one line per non-empty line of text, phone numbers,
/// e-mail and street addresses linked.
fn render_impressum(text: &str) -> Markup {
    html! {
        address.impressum {
            @for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                @let contact = detect_contact_type(line);
                div.impressum-line {
                    @match (contact.kind, &contact.link) {
                        (ContactKind::Text, _) | (_, None) => {
                            span { (contact.text) }
                        },
                        (ContactKind::Address, Some(link)) => {
                            (PreEscaped(ADDRESS_ICON))
                            a class=(LINK_CLASS) href=(link) target="_blank" rel="noopener noreferrer" {
                                (contact.text)
                            }
                        },
                        (kind, Some(link)) => {
                            (PreEscaped(icon(kind)))
                            a class=(LINK_CLASS) href=(link) { (contact.text) }
                        },
                    }
                }
            }
        }
    }
}

fn icon(kind: ContactKind) -> &'static str {
    match kind {
        ContactKind::Phone => PHONE_ICON,
        ContactKind::Fax => FAX_ICON,
        ContactKind::Email => EMAIL_ICON,
        ContactKind::Address => ADDRESS_ICON,
        ContactKind::Text => "",
    }
}

/// Category menu with hover dropdowns; collapses behind a toggle on
/// small screens. Categories and entries are shown in `order`.
pub fn render_navigation(categories: &[NavigationCategory]) -> Markup {
    let mut categories: Vec<&NavigationCategory> = categories.iter().collect();
    categories.sort_by_key(|c| c.order);

    html! {
        nav.site-nav aria-label="Hauptnavigation" {
            input.nav-toggle type="checkbox" id="nav-toggle";
            label.nav-hamburger for="nav-toggle" {
                span.hamburger-line {}
                span.hamburger-line {}
                span.hamburger-line {}
            }
            ul.nav-categories {
                @for category in categories {
                    @let entries = sorted_entries(category);
                    li.nav-category {
                        span.nav-category-label {
                            (category.name)
                            @if !entries.is_empty() {
                                (PreEscaped(CHEVRON))
                            }
                        }
                        @if !entries.is_empty() {
                            ul.nav-dropdown {
                                @for entry in entries {
                                    li {
                                        a href=(entry.link) { (entry.label) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn sorted_entries(category: &NavigationCategory) -> Vec<&NavigationEntry> {
    let mut entries: Vec<&NavigationEntry> = category.navigation_entries.iter().collect();
    entries.sort_by_key(|e| e.order);
    entries
}

pub fn render_footer(footer: &FooterData) -> Markup {
    html! {
        footer.site-footer {
            @if let Some(copyright) = footer.copyright.as_deref().filter(|c| !c.is_empty()) {
                span.copyright { (copyright) }
            }
        }
    }
}
