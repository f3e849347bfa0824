//! Markdown rendering for CMS rich text.
//!
//! CommonMark plus tables and strikethrough. Editors cannot inject markup:
//! raw HTML in the source is rendered as escaped text. Contact details in
//! the result are auto-linked by [`crate::contact`].

use crate::contact::enhance_contact_info_html;
use pulldown_cmark::{Event, Options, Parser, html as md_html};

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
}

/// Markdown to sanitised HTML, without contact linking.
pub fn markdown_to_html(src: &str) -> String {
    let parser = Parser::new_ext(src, options()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut html = String::with_capacity(src.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}

/// Markdown to HTML with contact details turned into links.
pub fn render_markdown(src: &str) -> String {
    enhance_contact_info_html(&markdown_to_html(src))
}
