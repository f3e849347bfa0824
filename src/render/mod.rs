//! HTML rendering with [maud](https://maud.lambda.xyz/).
//!
//! Each CMS component type has a render function returning [`Markup`];
//! pages are assembled from them top-down:
//!
//! ```text
//! document (head: meta, theme CSS, custom CSS, analytics)
//! └── header (logo, contact block, image strip, navigation)
//!     main
//!     ├── row    → groups at 2/3, 1/3, full width
//!     └── group  → content entries, sections
//!         └── section → content relations, gallery / teaser / triple tease / container
//!     footer
//! ```
//!
//! maud escapes every interpolated string. The only unescaped output is
//! markdown (already sanitised by [`crate::markdown`]), the theme and
//! editor CSS, and the icon SVGs defined in this crate.

mod components;
mod error;
mod header;
mod layout;
mod page;

pub use components::{render_gallery, render_progressive_image, render_teaser};
pub use error::{ErrorVariant, render_error_display, render_not_found};
pub use header::{render_footer, render_header, render_navigation};
pub use layout::{custom_css_tags, render_document};
pub use page::{render_page_content, render_section};

use crate::cms::media_url;
use crate::config::SiteConfig;
use crate::process::ProcessedManifest;

/// Everything a render function needs besides the component data.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub config: &'a SiteConfig,
    pub placeholders: &'a ProcessedManifest,
    /// Inline theme CSS (colour variables plus the base stylesheet).
    pub css: &'a str,
}

impl<'a> RenderContext<'a> {
    pub fn new(config: &'a SiteConfig, placeholders: &'a ProcessedManifest, css: &'a str) -> Self {
        Self {
            config,
            placeholders,
            css,
        }
    }

    /// Resolve a CMS media URL; empty when blocked or missing.
    pub fn image_url(&self, raw: &str) -> String {
        media_url(raw, &self.config.cms)
    }

    pub fn placeholder(&self, resolved: &str) -> Option<&'a str> {
        self.placeholders.placeholder(resolved)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::LazyLock;

    pub static CONFIG: LazyLock<SiteConfig> = LazyLock::new(|| {
        let mut config = SiteConfig::default();
        config.cms.url = "http://cms.test".into();
        config.site.url = "https://schule.test".into();
        config
    });

    pub static EMPTY: LazyLock<ProcessedManifest> = LazyLock::new(ProcessedManifest::default);

    pub fn ctx() -> RenderContext<'static> {
        RenderContext::new(&CONFIG, &EMPTY, "")
    }
}
