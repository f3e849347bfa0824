//! CMS data model shared by all pipeline stages.
//!
//! These types mirror the flat JSON shapes Strapi v5 returns (no
//! `attributes` wrapper) and are serialized verbatim into the snapshot
//! written by the fetch stage, so process and generate read exactly what
//! the CMS delivered.
//!
//! Strapi is loose about absent values: an empty media list can arrive as
//! `null`, `[]`, or not at all. Every collection and free-text field goes
//! through [`nullable`] so all three decode to the empty default.
//!
//! Variant fields (`variant`, teaser layouts, gallery layouts) stay raw
//! strings in the data and are interpreted by accessor methods, so an
//! editor typo degrades to the default layout instead of failing the whole
//! page.

use serde::{Deserialize, Deserializer, Serialize};

/// Decode `null` as `T::default()`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// An uploaded media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alternative_text: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// A page entry with its header, footer, metadata and content tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub slug: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub header: Option<HeaderData>,
    #[serde(default)]
    pub footer: Option<FooterData>,
    #[serde(default)]
    pub site_metadata: Option<SiteMetadata>,
    #[serde(default, deserialize_with = "nullable")]
    pub page_content: Vec<PageComponent>,
    /// Legacy flat group list, used only when `page_content` is empty.
    #[serde(default, deserialize_with = "nullable")]
    pub groups: Vec<GroupData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderData {
    #[serde(default)]
    pub logo: Option<Media>,
    /// Free-text contact block, one fact per line.
    #[serde(default)]
    pub impressum: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<Media>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FooterData {
    #[serde(default)]
    pub copyright: Option<String>,
}

/// Top-level dynamic zone entry of a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "__component")]
pub enum PageComponent {
    #[serde(rename = "page.row")]
    Row(RowData),
    #[serde(rename = "page.group")]
    Group(GroupData),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowData {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub groups: Vec<GroupData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupData {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub bg_image: Option<Media>,
    #[serde(default, deserialize_with = "nullable")]
    pub content: Vec<ContentEntry>,
    #[serde(default, deserialize_with = "nullable")]
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionData {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub bg_color: Option<String>,
    #[serde(default)]
    pub bg_image: Option<Media>,
    #[serde(default, deserialize_with = "nullable")]
    pub content: Vec<SectionComponent>,
    #[serde(default, deserialize_with = "nullable")]
    pub content_relation: Vec<ContentEntry>,
    /// Explicit inline flag from the CMS; `None` means auto-detect.
    #[serde(default)]
    pub inline: Option<bool>,
}

impl SectionData {
    /// `bgColor` wins over the older `background` field.
    pub fn background_color(&self) -> Option<&str> {
        self.bg_color
            .as_deref()
            .or(self.background.as_deref())
            .filter(|c| !c.trim().is_empty())
    }
}

/// A markdown content block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentEntry {
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentVariant {
    Default,
    Dark,
}

impl ContentEntry {
    pub fn variant(&self) -> ContentVariant {
        match self.variant.as_deref() {
            Some("dark") => ContentVariant::Dark,
            _ => ContentVariant::Default,
        }
    }
}

/// Component inside a section's dynamic zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "__component")]
pub enum SectionComponent {
    #[serde(rename = "image-gallery.image-gallery")]
    ImageGallery(GalleryData),
    #[serde(rename = "teaser.teaser")]
    Teaser(TeaserData),
    #[serde(rename = "triple-tease.triple-tease")]
    TripleTease(TripleTeaseData),
    #[serde(rename = "container.container")]
    Container(ContainerData),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub cta_link: Option<String>,
    #[serde(default)]
    pub cta_label: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<GalleryImage>,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryLayout {
    Slider,
    Grid,
}

impl GalleryData {
    pub fn layout(&self) -> GalleryLayout {
        match self.variant.as_deref() {
            Some("grid") => GalleryLayout::Grid,
            _ => GalleryLayout::Slider,
        }
    }
}

/// A gallery image: either a media file directly, or the legacy
/// `{ file, alt }` wrapper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alternative_text: Option<String>,
    #[serde(default)]
    pub file: Option<Media>,
    #[serde(default)]
    pub alt: Option<String>,
}

impl GalleryImage {
    /// Normalize to `(raw url, alt text)`. `None` when there is no usable file.
    pub fn source(&self) -> Option<(&str, String)> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            let alt = self
                .alternative_text
                .clone()
                .or_else(|| self.name.clone())
                .unwrap_or_else(|| "Gallery image".to_string());
            return Some((url, alt));
        }
        let file = self.file.as_ref().filter(|f| !f.url.is_empty())?;
        let alt = self
            .alt
            .clone()
            .or_else(|| file.name.clone())
            .unwrap_or_default();
        Some((file.url.as_str(), alt))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeaserData {
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub copy: String,
    #[serde(default)]
    pub cta_link: Option<String>,
    #[serde(default)]
    pub cta_label: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<Media>,
    /// Legacy single image.
    #[serde(default)]
    pub image: Option<Media>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeaserVariant {
    Classic,
    Modern,
    ArticleClassic,
    ArticleModern,
    Text,
}

impl TeaserData {
    pub fn variant(&self) -> TeaserVariant {
        match self.variant.as_deref() {
            Some("modern") => TeaserVariant::Modern,
            Some("articleClassic") => TeaserVariant::ArticleClassic,
            Some("articleModern") => TeaserVariant::ArticleModern,
            Some("text") => TeaserVariant::Text,
            _ => TeaserVariant::Classic,
        }
    }

    /// The image to show: first of `images`, else the legacy `image`.
    pub fn primary_image(&self) -> Option<&Media> {
        self.images
            .iter()
            .find(|m| !m.url.is_empty())
            .or_else(|| self.image.as_ref().filter(|m| !m.url.is_empty()))
    }

    /// Call to action, only when both link and label are set.
    pub fn cta(&self) -> Option<(&str, &str)> {
        cta_pair(self.cta_link.as_deref(), self.cta_label.as_deref())
    }
}

pub(crate) fn cta_pair<'a>(link: Option<&'a str>, label: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    match (link, label) {
        (Some(link), Some(label)) if !link.is_empty() && !label.is_empty() => Some((link, label)),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripleTeaseData {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub teasers: Vec<TeaserData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerData {
    #[serde(default, deserialize_with = "nullable")]
    pub children: Vec<SectionComponent>,
}

// ============================================================================
// Navigation
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationCategory {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub navigation_entries: Vec<NavigationEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationEntry {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    #[serde(default, deserialize_with = "nullable")]
    pub link: String,
    #[serde(default)]
    pub order: i64,
}

// ============================================================================
// Site metadata, custom CSS, 404 page
// ============================================================================

/// SEO and social metadata, per page or as the site-wide "Default" entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub favicon: Option<Media>,
    #[serde(default)]
    pub og_title: Option<String>,
    #[serde(default)]
    pub og_description: Option<String>,
    #[serde(default)]
    pub og_image: Option<Media>,
    #[serde(default)]
    pub og_type: Option<String>,
    #[serde(default)]
    pub og_locale: Option<String>,
    #[serde(default)]
    pub og_site_name: Option<String>,
    #[serde(default)]
    pub twitter_card: Option<String>,
    #[serde(default)]
    pub twitter_title: Option<String>,
    #[serde(default)]
    pub twitter_description: Option<String>,
    #[serde(default)]
    pub twitter_image: Option<Media>,
    #[serde(default)]
    pub twitter_site: Option<String>,
    #[serde(default)]
    pub twitter_creator: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub robots: Option<String>,
    #[serde(default)]
    pub theme_color: Option<String>,
    #[serde(default)]
    pub apple_touch_icon: Option<Media>,
}

/// An editor-managed stylesheet. `slug: None` means global.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomCss {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub css: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
}

/// Content of the "page not found" screen. Every text field has a German
/// default for when the CMS leaves it blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundPage {
    #[serde(default)]
    pub image: Option<Media>,
    #[serde(default = "default_headline", deserialize_with = "or_default_headline")]
    pub headline: String,
    #[serde(default = "default_description", deserialize_with = "or_default_description")]
    pub description: String,
    #[serde(default = "default_primary_text", deserialize_with = "or_default_primary_text")]
    pub primary_button_text: String,
    #[serde(default = "default_primary_url", deserialize_with = "or_default_primary_url")]
    pub primary_button_url: String,
    #[serde(default = "default_secondary_text", deserialize_with = "or_default_secondary_text")]
    pub secondary_button_text: String,
    #[serde(default = "default_help_text", deserialize_with = "or_default_help_text")]
    pub help_text: String,
    #[serde(default, deserialize_with = "nullable")]
    pub helpful_links: Vec<Link>,
}

macro_rules! text_default {
    ($default:ident, $or_default:ident, $text:expr) => {
        fn $default() -> String {
            $text.to_string()
        }

        fn $or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
            Ok(Option::<String>::deserialize(deserializer)?
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else($default))
        }
    };
}

text_default!(default_headline, or_default_headline, "Seite nicht gefunden");
text_default!(
    default_description,
    or_default_description,
    "Die von Ihnen gesuchte Seite existiert nicht oder wurde verschoben."
);
text_default!(default_primary_text, or_default_primary_text, "Zur Startseite");
text_default!(default_primary_url, or_default_primary_url, "/");
text_default!(default_secondary_text, or_default_secondary_text, "Zurück");
text_default!(
    default_help_text,
    or_default_help_text,
    "Vielleicht finden Sie hier was Sie suchen:"
);

impl Default for NotFoundPage {
    fn default() -> Self {
        Self {
            image: None,
            headline: default_headline(),
            description: default_description(),
            primary_button_text: default_primary_text(),
            primary_button_url: default_primary_url(),
            secondary_button_text: default_secondary_text(),
            help_text: default_help_text(),
            helpful_links: Vec::new(),
        }
    }
}

/// A page slug with its last CMS update, as listed for the sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugEntry {
    pub slug: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}
