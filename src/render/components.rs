//! Section components: teasers, galleries, containers and images.

use super::RenderContext;
use crate::types::{
    ContainerData, GalleryData, GalleryLayout, Media, SectionComponent, TeaserData, TeaserVariant,
    TripleTeaseData, cta_pair,
};
use maud::{Markup, html};
use tracing::debug;

/// An image to render, before URL resolution.
pub struct ImageSpec<'a> {
    /// Raw CMS URL.
    pub src: &'a str,
    pub alt: &'a str,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub class: &'a str,
    /// Load immediately instead of lazily (first slide, header strip).
    pub eager: bool,
}

/// `<img>` with its blur placeholder painted behind it when one exists.
/// Renders nothing for an empty or blocked URL.
pub fn render_progressive_image(ctx: &RenderContext<'_>, image: &ImageSpec<'_>) -> Markup {
    let url = ctx.image_url(image.src);
    if url.is_empty() {
        return html! {};
    }
    let loading = if image.eager { "eager" } else { "lazy" };
    let img = html! {
        img class=(image.class) src=(url) alt=(image.alt)
            width=[image.width] height=[image.height]
            loading=(loading) decoding="async";
    };
    match ctx.placeholder(&url) {
        Some(data_url) => html! {
            div.progressive-image style=(format!(
                r#"background-image:url("{data_url}");background-size:cover;background-position:center"#
            )) {
                (img)
            }
        },
        None => img,
    }
}

fn media_spec<'a>(media: &'a Media, alt: &'a str, width: u32, height: u32, class: &'a str) -> ImageSpec<'a> {
    ImageSpec {
        src: &media.url,
        alt,
        width: Some(media.width.unwrap_or(width)),
        height: Some(media.height.unwrap_or(height)),
        class,
        eager: false,
    }
}

/// Alt text for a teaser image: alternative text, file name, teaser title.
fn teaser_alt<'a>(media: &'a Media, title: &'a str) -> &'a str {
    media
        .alternative_text
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(media.name.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or(title)
}

fn cta(link: Option<(&str, &str)>, class: &str) -> Markup {
    html! {
        @if let Some((href, label)) = link {
            a class=(class) href=(href) { (label) }
        }
    }
}

pub fn render_teaser(ctx: &RenderContext<'_>, teaser: &TeaserData) -> Markup {
    let variant = teaser.variant();
    let class = match variant {
        TeaserVariant::Classic => "teaser teaser-classic",
        TeaserVariant::Modern => "teaser teaser-modern",
        TeaserVariant::ArticleClassic => "teaser teaser-article-classic",
        TeaserVariant::ArticleModern => "teaser teaser-article-modern",
        TeaserVariant::Text => "teaser teaser-text",
    };
    let class = match teaser.class_name.as_deref().filter(|c| !c.is_empty()) {
        Some(extra) => format!("{class} {extra}"),
        None => class.to_string(),
    };
    let image = teaser.primary_image();
    let title = teaser.title.as_str();

    match variant {
        TeaserVariant::Classic => html! {
            div class=(class) {
                h2.teaser-title { (title) }
                @if let Some(media) = image {
                    (render_progressive_image(ctx, &ImageSpec {
                        height: Some(248),
                        ..media_spec(media, teaser_alt(media, title), 379, 248, "teaser-image")
                    }))
                }
                p.teaser-copy { (teaser.copy) }
                span.teaser-spacer {}
                (cta(teaser.cta(), "button teaser-cta"))
            }
        },
        TeaserVariant::Modern => html! {
            div class=(class) {
                div.teaser-media {
                    @if let Some(media) = image {
                        (render_progressive_image(ctx, &media_spec(media, teaser_alt(media, title), 700, 800, "teaser-image")))
                    }
                }
                div.teaser-body {
                    h2.teaser-title { (title) }
                    p.teaser-copy { (teaser.copy) }
                    (cta(teaser.cta(), "button teaser-cta"))
                }
            }
        },
        TeaserVariant::ArticleClassic | TeaserVariant::ArticleModern => html! {
            article class=(class) {
                @if let Some(media) = image {
                    div.teaser-media {
                        (render_progressive_image(ctx, &media_spec(media, teaser_alt(media, title), 320, 180, "teaser-image")))
                    }
                }
                h2.teaser-title { (title) }
                p.teaser-copy { (teaser.copy) }
                (cta(teaser.cta(), "button teaser-cta"))
            }
        },
        TeaserVariant::Text => html! {
            div class=(class) {
                h2.teaser-title { (title) }
                @if !teaser.copy.is_empty() {
                    p.teaser-copy { (teaser.copy) }
                }
                (cta(teaser.cta(), "button teaser-cta"))
            }
        },
    }
}

pub fn render_triple_tease(ctx: &RenderContext<'_>, triple: &TripleTeaseData) -> Markup {
    html! {
        div.triple-tease {
            @if !triple.title.is_empty() {
                h2.triple-tease-title { (triple.title) }
            }
            div.triple-tease-row {
                @for teaser in &triple.teasers {
                    div.triple-tease-item { (render_teaser(ctx, teaser)) }
                }
            }
        }
    }
}

/// Whether a gallery fills the viewport or sits in the content flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryDisplay {
    Fullscreen,
    Inline,
}

/// Image gallery as a scroll-snap slider or a grid.
///
/// `autocycle` (seconds) is handed to `gallery.js` through `data-autocycle`.
pub fn render_gallery(
    ctx: &RenderContext<'_>,
    gallery: &GalleryData,
    display: GalleryDisplay,
    autocycle: Option<u32>,
) -> Markup {
    let images: Vec<(&str, String)> = gallery
        .images
        .iter()
        .filter_map(|image| image.source())
        .filter(|(url, _)| !ctx.image_url(url).is_empty())
        .collect();
    if images.is_empty() {
        return html! {};
    }

    let layout = gallery.layout();
    let class = format!(
        "gallery {} {}",
        match layout {
            GalleryLayout::Slider => "gallery-slider",
            GalleryLayout::Grid => "gallery-grid",
        },
        match display {
            GalleryDisplay::Fullscreen => "gallery-fullscreen",
            GalleryDisplay::Inline => "gallery-inline",
        }
    );
    let autocycle = autocycle.filter(|_| layout == GalleryLayout::Slider && images.len() > 1);
    let cta = cta_pair(gallery.cta_link.as_deref(), gallery.cta_label.as_deref());
    let has_overlay = gallery.title.is_some() || gallery.subtitle.is_some() || cta.is_some();

    html! {
        section class=(class) data-autocycle=[autocycle] {
            div.gallery-track {
                @for (idx, (src, alt)) in images.iter().enumerate() {
                    div.gallery-slide {
                        (render_progressive_image(ctx, &ImageSpec {
                            src,
                            alt,
                            width: None,
                            height: None,
                            class: "gallery-image",
                            eager: idx == 0,
                        }))
                    }
                }
            }
            @if has_overlay {
                div.gallery-overlay {
                    @if let Some(title) = &gallery.title {
                        h2.gallery-title { (title) }
                    }
                    @if let Some(subtitle) = &gallery.subtitle {
                        p.gallery-subtitle { (subtitle) }
                    }
                    @if let Some((href, label)) = cta {
                        a.button.gallery-cta href=(href) rel="noopener noreferrer" { (label) }
                    }
                }
            }
            @if layout == GalleryLayout::Slider && images.len() > 1 {
                div.gallery-dots {
                    @for idx in 0..images.len() {
                        button.gallery-dot type="button" data-index=(idx)
                            aria-label=(format!("Bild {}", idx + 1)) {}
                    }
                }
            }
        }
    }
}

/// Masonry columns; each child keeps itself in one column.
pub fn render_container(ctx: &RenderContext<'_>, container: &ContainerData) -> Markup {
    html! {
        div.container-masonry {
            @for child in &container.children {
                @let inner = render_container_child(ctx, child);
                @if !inner.0.is_empty() {
                    div.masonry-item { (inner) }
                }
            }
        }
    }
}

/// Galleries inside a container are always inline and never autocycle.
fn render_container_child(ctx: &RenderContext<'_>, child: &SectionComponent) -> Markup {
    match child {
        SectionComponent::ImageGallery(gallery) => {
            render_gallery(ctx, gallery, GalleryDisplay::Inline, None)
        }
        SectionComponent::Teaser(teaser) => render_teaser(ctx, teaser),
        SectionComponent::TripleTease(triple) => render_triple_tease(ctx, triple),
        SectionComponent::Container(nested) => render_container(ctx, nested),
        SectionComponent::Unknown => {
            debug!("skipping unknown component inside container");
            html! {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessedManifest;
    use crate::render::test_support::{CONFIG, ctx};
    use crate::types::GalleryImage;

    fn media(url: &str) -> Media {
        Media {
            url: url.into(),
            ..Default::default()
        }
    }

    fn gallery(urls: &[&str]) -> GalleryData {
        GalleryData {
            images: urls
                .iter()
                .map(|u| GalleryImage {
                    url: Some(u.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn progressive_image_uses_placeholder_background() {
        let mut manifest = ProcessedManifest::default();
        manifest.placeholders.insert(
            "http://cms.test/uploads/a.jpg".into(),
            "data:image/jpeg;base64,AAA".into(),
        );
        let ctx = RenderContext::new(&CONFIG, &manifest, "");
        let spec = ImageSpec {
            src: "/uploads/a.jpg",
            alt: "A",
            width: Some(10),
            height: None,
            class: "x",
            eager: false,
        };
        let html = render_progressive_image(&ctx, &spec).into_string();
        assert!(html.contains(r#"background-image:url(&quot;data:image/jpeg;base64,AAA&quot;)"#));
        assert!(html.contains(r#"loading="lazy""#));
        assert!(html.contains(r#"width="10""#));
        assert!(!html.contains("height="));
    }

    #[test]
    fn progressive_image_without_placeholder_is_plain() {
        let spec = ImageSpec {
            src: "/uploads/b.jpg",
            alt: "B",
            width: None,
            height: None,
            class: "x",
            eager: true,
        };
        let html = render_progressive_image(&ctx(), &spec).into_string();
        assert!(html.starts_with("<img"));
        assert!(html.contains(r#"loading="eager""#));
    }

    #[test]
    fn blocked_image_renders_nothing() {
        let spec = ImageSpec {
            src: "https://bucket.s3.eu-central-1.amazonaws.com/a.jpg",
            alt: "",
            width: None,
            height: None,
            class: "x",
            eager: false,
        };
        assert!(render_progressive_image(&ctx(), &spec).into_string().is_empty());
    }

    #[test]
    fn teaser_variants_pick_their_layout() {
        for (variant, class) in [
            (None, "teaser-classic"),
            (Some("modern"), "teaser-modern"),
            (Some("articleClassic"), "teaser-article-classic"),
            (Some("articleModern"), "teaser-article-modern"),
            (Some("text"), "teaser-text"),
        ] {
            let teaser = TeaserData {
                variant: variant.map(String::from),
                title: "Projektwoche".into(),
                copy: "Alles über die Woche".into(),
                images: vec![media("/uploads/t.jpg")],
                ..Default::default()
            };
            let html = render_teaser(&ctx(), &teaser).into_string();
            assert!(html.contains(class), "{class} missing in {html}");
            assert!(html.contains("Projektwoche"));
            assert_eq!(
                html.contains("<img"),
                variant != Some("text"),
                "image presence for {variant:?}"
            );
        }
    }

    #[test]
    fn classic_teaser_image_dimensions_and_alt() {
        let teaser = TeaserData {
            title: "Hof".into(),
            image: Some(media("/uploads/hof.jpg")),
            ..Default::default()
        };
        let html = render_teaser(&ctx(), &teaser).into_string();
        assert!(html.contains(r#"alt="Hof""#));
        assert!(html.contains(r#"width="379" height="248""#));
    }

    #[test]
    fn teaser_cta_needs_link_and_label() {
        let mut teaser = TeaserData {
            title: "T".into(),
            cta_link: Some("/mehr".into()),
            ..Default::default()
        };
        assert!(!render_teaser(&ctx(), &teaser).into_string().contains("teaser-cta"));
        teaser.cta_label = Some("Mehr".into());
        let html = render_teaser(&ctx(), &teaser).into_string();
        assert!(html.contains(r#"href="/mehr">Mehr</a>"#));
    }

    #[test]
    fn teaser_text_is_escaped() {
        let teaser = TeaserData {
            title: "<script>x</script>".into(),
            ..Default::default()
        };
        let html = render_teaser(&ctx(), &teaser).into_string();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn slider_first_slide_eager_rest_lazy() {
        let html = render_gallery(
            &ctx(),
            &gallery(&["/u/1.jpg", "/u/2.jpg", "/u/3.jpg"]),
            GalleryDisplay::Fullscreen,
            Some(7),
        )
        .into_string();
        assert!(html.contains("gallery-slider gallery-fullscreen"));
        assert!(html.contains(r#"data-autocycle="7""#));
        assert_eq!(html.matches(r#"loading="eager""#).count(), 1);
        assert_eq!(html.matches(r#"loading="lazy""#).count(), 2);
        assert_eq!(html.matches("gallery-dot").count(), 3 + 1);
    }

    #[test]
    fn grid_gallery_never_autocycles() {
        let mut data = gallery(&["/u/1.jpg", "/u/2.jpg"]);
        data.variant = Some("grid".into());
        let html = render_gallery(&ctx(), &data, GalleryDisplay::Inline, Some(7)).into_string();
        assert!(html.contains("gallery-grid gallery-inline"));
        assert!(!html.contains("data-autocycle"));
        assert!(!html.contains("gallery-dot"));
    }

    #[test]
    fn gallery_overlay_and_cta() {
        let mut data = gallery(&["/u/1.jpg"]);
        data.title = Some("Sommerfest".into());
        data.cta_link = Some("https://fotos.test".into());
        data.cta_label = Some("Alle Fotos".into());
        let html = render_gallery(&ctx(), &data, GalleryDisplay::Inline, None).into_string();
        assert!(html.contains("<h2 class=\"gallery-title\">Sommerfest</h2>"));
        assert!(html.contains(r#"rel="noopener noreferrer""#));
    }

    #[test]
    fn empty_gallery_renders_nothing() {
        let html = render_gallery(&ctx(), &gallery(&[]), GalleryDisplay::Inline, None);
        assert!(html.into_string().is_empty());
    }

    #[test]
    fn container_wraps_children_and_inlines_galleries() {
        let container = ContainerData {
            children: vec![
                SectionComponent::ImageGallery(gallery(&["/u/1.jpg", "/u/2.jpg"])),
                SectionComponent::Unknown,
                SectionComponent::Teaser(TeaserData {
                    variant: Some("text".into()),
                    title: "Info".into(),
                    ..Default::default()
                }),
            ],
        };
        let html = render_container(&ctx(), &container).into_string();
        assert_eq!(html.matches("masonry-item").count(), 2);
        assert!(html.contains("gallery-inline"));
        assert!(!html.contains("data-autocycle"));
    }
}
