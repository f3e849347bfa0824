//! Error screens: CMS outage, unknown slug, and the site's 404 page.

use super::RenderContext;
use super::components::{ImageSpec, render_progressive_image};
use crate::types::NotFoundPage;
use maud::{Markup, html};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorVariant {
    /// The CMS could not be reached.
    Error,
    /// The CMS answered but has no such page.
    NotFound,
}

impl ErrorVariant {
    fn class(self) -> &'static str {
        match self {
            Self::Error => "error-display error-display-error",
            Self::NotFound => "error-display error-display-404",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Self::Error => "⚠️",
            Self::NotFound => "🔍",
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            Self::Error => "Service Unavailable",
            Self::NotFound => "Page Not Found",
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            Self::Error => {
                "Unable to connect to the content management system. Please try again later."
            }
            Self::NotFound => "The page you're looking for doesn't exist or has been moved.",
        }
    }
}

/// Error card with a single action.
///
/// The error variant offers a retry link back to `retry_url`; the 404
/// variant always links home.
pub fn render_error_display(
    variant: ErrorVariant,
    message: Option<&str>,
    error: Option<&str>,
    retry_url: Option<&str>,
) -> Markup {
    let (href, label) = match variant {
        ErrorVariant::Error => (retry_url.unwrap_or("/"), "Retry"),
        ErrorVariant::NotFound => ("/", "Go Home"),
    };
    html! {
        div class=(variant.class()) {
            div.error-card {
                div.error-icon aria-hidden="true" { (variant.icon()) }
                h2.error-title { (variant.default_title()) }
                p.error-message { (message.unwrap_or(variant.default_message())) }
                @if let Some(error) = error {
                    p.error-detail { "Error: " (error) }
                }
                div.error-actions {
                    a.button href=(href) { (label) }
                }
            }
        }
    }
}

/// Body of the CMS-managed "page not found" screen.
pub fn render_not_found(ctx: &RenderContext<'_>, page: &NotFoundPage) -> Markup {
    let image = page
        .image
        .as_ref()
        .filter(|m| !ctx.image_url(&m.url).is_empty());
    let layout = if image.is_some() {
        "not-found not-found-with-image"
    } else {
        "not-found"
    };

    html! {
        div class=(layout) {
            @if let Some(media) = image {
                div.not-found-image {
                    (render_progressive_image(ctx, &ImageSpec {
                        src: &media.url,
                        alt: media.alternative_text.as_deref().unwrap_or("404 error"),
                        width: media.width,
                        height: media.height,
                        class: "not-found-img",
                        eager: true,
                    }))
                }
            }
            div.not-found-text {
                h1.not-found-code { "404" }
                h2.not-found-headline { (page.headline) }
                p.not-found-description { (page.description) }
                div.not-found-actions {
                    a.button href=(page.primary_button_url) { (page.primary_button_text) }
                    button.button.button-secondary type="button" onclick="window.history.back()" {
                        (page.secondary_button_text)
                    }
                }
                @if !page.helpful_links.is_empty() {
                    div.not-found-help {
                        p { (page.help_text) }
                        div.not-found-links {
                            @for link in &page.helpful_links {
                                a href=(link.url) { (link.label) }
                            }
                        }
                    }
                }
            }
        }
    }
}
