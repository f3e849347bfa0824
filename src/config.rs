//! Site configuration module.
//!
//! Handles loading, validating, and layering `config.toml`. Stock defaults
//! are overridden by the user's file, which is in turn overridden by a few
//! deployment environment variables.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [cms]
//! url = "http://localhost:1337"   # Strapi base URL (env: STRAPI_URL)
//! timeout_secs = 30               # Per-request timeout
//! max_retries = 3                 # Attempts per request
//! retry_delay_ms = 2000           # Fixed delay between attempts
//! page_size = 100                 # Pagination size for slug listing
//! blocked_media_hosts = ["s3.eu"] # Media URLs containing these are dropped
//!
//! [site]
//! url = "http://localhost:3000"   # Public base URL (env: SITE_URL)
//! domain = "localhost"            # Sitemap host (env: FRONTEND_DOMAIN)
//! default_title = "Schule"
//! title_template = "%s | Schule"
//! description = "Willkommen"
//! lang = "de"
//! locale = "de_DE"
//!
//! [images]
//! blur_size = 8                   # Placeholder edge in pixels
//! blur_quality = 20               # Placeholder JPEG quality
//!
//! [og]
//! width = 1200
//! height = 630
//! cache_dir = ".og-cache"
//! settle_ms = 2000                # Wait after load before capturing
//! navigation_timeout_secs = 120
//! # max_age_secs = 30             # Optional hard expiry on top of CMS timestamps
//!
//! [serve]
//! bind = "127.0.0.1:3000"
//!
//! [colors.light]
//! background = "#ffffff"
//! text = "#111827"
//! text_muted = "#4b5563"
//! border = "#e5e7eb"
//! accent = "#16a34a"
//! accent_hover = "#15803d"
//!
//! [processing]
//! max_processes = 4               # Max parallel workers (omit for auto)
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown
//! keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Where content comes from and how hard to try.
    pub cms: CmsConfig,
    /// Public identity of the site (URLs, titles, locale).
    pub site: SiteSettings,
    /// Blur placeholder generation.
    pub images: ImagesConfig,
    /// Open Graph screenshot settings.
    pub og: OgConfig,
    /// HTTP server settings.
    pub serve: ServeConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cms.max_retries == 0 {
            return Err(ConfigError::Validation(
                "cms.max_retries must be at least 1".into(),
            ));
        }
        if self.cms.page_size == 0 {
            return Err(ConfigError::Validation(
                "cms.page_size must be non-zero".into(),
            ));
        }
        if !(1..=64).contains(&self.images.blur_size) {
            return Err(ConfigError::Validation(
                "images.blur_size must be 1-64".into(),
            ));
        }
        if !(1..=100).contains(&self.images.blur_quality) {
            return Err(ConfigError::Validation(
                "images.blur_quality must be 1-100".into(),
            ));
        }
        if self.og.width == 0 || self.og.height == 0 {
            return Err(ConfigError::Validation(
                "og.width and og.height must be non-zero".into(),
            ));
        }
        if !self.site.title_template.contains("%s") {
            return Err(ConfigError::Validation(
                "site.title_template must contain %s".into(),
            ));
        }
        Ok(())
    }
}

/// CMS connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmsConfig {
    /// Strapi base URL without trailing slash.
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Total attempts per request (1 = no retry).
    pub max_retries: u32,
    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// Page size used when listing slugs.
    pub page_size: u32,
    /// Media URLs containing any of these fragments resolve to nothing.
    pub blocked_media_hosts: Vec<String>,
}

impl CmsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:1337".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 2000,
            page_size: 100,
            blocked_media_hosts: vec!["s3.eu".to_string()],
        }
    }
}

/// Public site identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSettings {
    /// Base URL the site is reachable at; screenshots are taken from here.
    pub url: String,
    /// Host name used in sitemap locations (`https://{domain}`).
    pub domain: String,
    /// Title used when no metadata is available at all.
    pub default_title: String,
    /// Page title template; `%s` is replaced with the page title.
    pub title_template: String,
    /// Description used when no metadata is available at all.
    pub description: String,
    /// `<html lang>` value.
    pub lang: String,
    /// Default Open Graph locale.
    pub locale: String,
    /// Optional analytics script URL, loaded with `defer`.
    pub analytics_script: Option<String>,
    /// `data-website-id` for the analytics script.
    pub analytics_website_id: Option<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            domain: "localhost".to_string(),
            default_title: "Schule".to_string(),
            title_template: "%s | Schule".to_string(),
            description: "Willkommen".to_string(),
            lang: "de".to_string(),
            locale: "de_DE".to_string(),
            analytics_script: None,
            analytics_website_id: None,
        }
    }
}

/// Blur placeholder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Edge length of the square placeholder in pixels.
    pub blur_size: u32,
    /// JPEG quality of the placeholder (1-100).
    pub blur_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            blur_size: 8,
            blur_quality: 20,
        }
    }
}

/// Open Graph screenshot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OgConfig {
    pub width: u32,
    pub height: u32,
    /// Directory holding `{key}.png` screenshots.
    pub cache_dir: String,
    /// Optional hard expiry in seconds. Younger screenshots are served
    /// without asking the CMS.
    pub max_age_secs: Option<u64>,
    /// Wait after page load before capturing, in milliseconds.
    pub settle_ms: u64,
    /// Navigation timeout in seconds.
    pub navigation_timeout_secs: u64,
}

impl Default for OgConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 630,
            cache_dir: ".og-cache".to_string(),
            max_age_secs: None,
            settle_ms: 2000,
            navigation_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    pub text: String,
    /// Secondary text (navigation, captions, footer).
    pub text_muted: String,
    pub border: String,
    /// Buttons and links.
    pub accent: String,
    pub accent_hover: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#111827".to_string(),
            text_muted: "#4b5563".to_string(),
            border: "#e5e7eb".to_string(),
            accent: "#16a34a".to_string(),
            accent_hover: "#15803d".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#111827".to_string(),
            text: "#f3f4f6".to_string(),
            text_muted: "#d1d5db".to_string(),
            border: "#374151".to_string(),
            accent: "#22c55e".to_string(),
            accent_hover: "#16a34a".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    // Only Option fields can fail serialization and they are skipped as None.
    toml::Value::try_from(SiteConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Deployment overrides read from the environment.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub cms_url: Option<String>,
    pub site_url: Option<String>,
    pub domain: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            cms_url: var("STRAPI_URL"),
            site_url: var("SITE_URL"),
            domain: var("FRONTEND_DOMAIN"),
        }
    }

    pub fn apply(&self, config: &mut SiteConfig) {
        if let Some(url) = &self.cms_url {
            config.cms.url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = &self.site_url {
            config.site.url = url.trim_end_matches('/').to_string();
        }
        if let Some(domain) = &self.domain {
            config.site.domain = domain.clone();
        }
    }
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// applies environment overrides, and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    let mut config = resolve_config(base, overlay)?;
    EnvOverrides::from_env().apply(&mut config);
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# schoolsite configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# Environment variables override the file:
#   STRAPI_URL       -> cms.url
#   SITE_URL         -> site.url
#   FRONTEND_DOMAIN  -> site.domain

# ---------------------------------------------------------------------------
# Content source
# ---------------------------------------------------------------------------
[cms]
# Strapi base URL, without trailing slash.
url = "http://localhost:1337"

# Per-request timeout in seconds.
timeout_secs = 30

# Attempts per request and the fixed delay between them.
max_retries = 3
retry_delay_ms = 2000

# Page size when listing all page slugs.
page_size = 100

# Media URLs containing any of these fragments are not rendered.
blocked_media_hosts = ["s3.eu"]

# ---------------------------------------------------------------------------
# Site identity
# ---------------------------------------------------------------------------
[site]
# Public base URL. OG screenshots are taken of pages under this URL.
url = "http://localhost:3000"

# Host used for sitemap locations (https://{domain}/...).
domain = "localhost"

# Fallbacks used when neither the page nor the CMS "Default" entry has metadata.
default_title = "Schule"
description = "Willkommen"

# Page title template; %s is the page title.
title_template = "%s | Schule"

lang = "de"
locale = "de_DE"

# Optional analytics script, loaded with defer.
# analytics_script = "https://cloud.umami.is/script.js"
# analytics_website_id = "..."

# ---------------------------------------------------------------------------
# Blur placeholders
# ---------------------------------------------------------------------------
[images]
# Square placeholder edge in pixels and its JPEG quality.
blur_size = 8
blur_quality = 20

# ---------------------------------------------------------------------------
# Open Graph screenshots
# ---------------------------------------------------------------------------
[og]
width = 1200
height = 630
cache_dir = ".og-cache"

# Wait after the page has loaded before capturing (ms).
settle_ms = 2000
navigation_timeout_secs = 120

# Screenshots are re-rendered when the CMS entry changed after the file was
# written. Set this to expire them after a fixed number of seconds instead;
# a younger screenshot is then served without asking the CMS.
# max_age_secs = 30

# ---------------------------------------------------------------------------
# HTTP server (schoolsite serve)
# ---------------------------------------------------------------------------
[serve]
bind = "127.0.0.1:3000"

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#111827"
text_muted = "#4b5563"
border = "#e5e7eb"
accent = "#16a34a"
accent_hover = "#15803d"

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#111827"
text = "#f3f4f6"
text_muted = "#d1d5db"
border = "#374151"
accent = "#22c55e"
accent_hover = "#16a34a"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image workers. Omit to auto-detect (= CPU cores).
# max_processes = 4
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {light_bg};
    --color-text: {light_text};
    --color-text-muted: {light_text_muted};
    --color-border: {light_border};
    --color-accent: {light_accent};
    --color-accent-hover: {light_accent_hover};
}}

@media (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {dark_bg};
        --color-text: {dark_text};
        --color-text-muted: {dark_text_muted};
        --color-border: {dark_border};
        --color-accent: {dark_accent};
        --color-accent-hover: {dark_accent_hover};
    }}
}}"#,
        light_bg = colors.light.background,
        light_text = colors.light.text,
        light_text_muted = colors.light.text_muted,
        light_border = colors.light.border,
        light_accent = colors.light.accent,
        light_accent_hover = colors.light.accent_hover,
        dark_bg = colors.dark.background,
        dark_text = colors.dark.text,
        dark_text_muted = colors.dark.text_muted,
        dark_border = colors.dark.border,
        dark_accent = colors.dark.accent,
        dark_accent_hover = colors.dark.accent_hover,
    )
}
