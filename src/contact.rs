//! Contact detail auto-linking.
//!
//! School pages are full of phone numbers, e-mail addresses and street
//! addresses typed as plain text. [`enhance_contact_info_html`] turns them
//! into `tel:`, `mailto:` and Google Maps links with a small icon in front,
//! without touching markup or text that is already inside a link.
//!
//! [`detect_contact_type`] does the same classification for one whole line,
//! which is how the header's contact block is rendered.

use regex::{Captures, Regex};
use std::sync::LazyLock;

pub const LINK_CLASS: &str = "contact-link";

pub const PHONE_ICON: &str = r#"<svg class="contact-icon" fill="currentColor" viewBox="0 0 20 20" aria-hidden="true"><path d="M2 3a1 1 0 011-1h2.153a1 1 0 01.986.836l.74 4.435a1 1 0 01-.54 1.06l-1.548.773a11.037 11.037 0 006.105 6.105l.774-1.548a1 1 0 011.059-.54l4.435.74a1 1 0 01.836.986V17a1 1 0 01-1 1h-2C7.82 18 2 12.18 2 5V3z"/></svg>"#;
pub const FAX_ICON: &str = r#"<svg class="contact-icon" fill="currentColor" viewBox="0 0 20 20" aria-hidden="true"><path fill-rule="evenodd" d="M5 4v3H4a2 2 0 00-2 2v3a2 2 0 002 2h1v2a2 2 0 002 2h6a2 2 0 002-2v-2h1a2 2 0 002-2V9a2 2 0 00-2-2h-1V4a2 2 0 00-2-2H7a2 2 0 00-2 2zm8 0H7v3h6V4zm0 8H7v4h6v-4z" clip-rule="evenodd"/></svg>"#;
pub const EMAIL_ICON: &str = r#"<svg class="contact-icon" fill="currentColor" viewBox="0 0 20 20" aria-hidden="true"><path d="M2.003 5.884L10 9.882l7.997-3.998A2 2 0 0016 4H4a2 2 0 00-1.997 1.884z"/><path d="M18 8.118l-8 4-8-4V14a2 2 0 002 2h12a2 2 0 002-2V8.118z"/></svg>"#;
pub const ADDRESS_ICON: &str = r#"<svg class="contact-icon" fill="currentColor" viewBox="0 0 20 20" aria-hidden="true"><path fill-rule="evenodd" d="M5.05 4.05a7 7 0 119.9 9.9L10 18.9l-4.95-4.95a7 7 0 010-9.9zM10 11a2 2 0 100-4 2 2 0 000 4z" clip-rule="evenodd"/></svg>"#;

const PHONE: &str = r"\b(Tel\.?:?\s*|Telefon:?\s*)([\d\s\-+()/]+)";
const FAX: &str = r"\b(Fax\.?:?\s*)([\d\s\-+()/]+)";
const EMAIL: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";
const ADDRESS: &str = r"[A-Za-zäöüßÄÖÜ\-.\s]+(?:str\.|straße|weg|platz|gasse|allee)\.?\s+\d+[a-z]?,?\s+\d{5}\s+[A-Za-zäöüßÄÖÜ\s]+";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("contact patterns are valid")
}

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| compile(&format!("(?i){PHONE}")));
static FAX_RE: LazyLock<Regex> = LazyLock::new(|| compile(&format!("(?i){FAX}")));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| compile(EMAIL));
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| compile(&format!("(?i){ADDRESS}")));

static PHONE_LINE: LazyLock<Regex> = LazyLock::new(|| compile(&format!("(?i)^{PHONE}$")));
static FAX_LINE: LazyLock<Regex> = LazyLock::new(|| compile(&format!("(?i)^{FAX}$")));
static EMAIL_LINE: LazyLock<Regex> = LazyLock::new(|| compile(&format!("^{EMAIL}$")));
static ADDRESS_LINE: LazyLock<Regex> = LazyLock::new(|| compile(&format!("(?i)^{ADDRESS}$")));

/// Strip the characters that may not appear in a `tel:` URI.
pub fn clean_phone_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '/'))
        .collect()
}

/// Google Maps search URL for a free-text address.
pub fn maps_url(address: &str) -> String {
    let query: String = url::form_urlencoded::byte_serialize(address.trim().as_bytes()).collect();
    format!("https://www.google.com/maps/search/?api=1&query={query}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Phone,
    Fax,
    Email,
    Address,
    Text,
}

/// A classified line of contact text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedContact {
    pub kind: ContactKind,
    /// The trimmed line.
    pub text: String,
    pub link: Option<String>,
}

/// Classify a whole line as phone, fax, e-mail, address or plain text.
pub fn detect_contact_type(line: &str) -> DetectedContact {
    let text = line.trim().to_string();
    let (kind, link) = if let Some(caps) = PHONE_LINE.captures(&text).filter(has_digit) {
        (ContactKind::Phone, Some(format!("tel:{}", clean_phone_number(&caps[2]))))
    } else if let Some(caps) = FAX_LINE.captures(&text).filter(has_digit) {
        (ContactKind::Fax, Some(format!("tel:{}", clean_phone_number(&caps[2]))))
    } else if EMAIL_LINE.is_match(&text) {
        (ContactKind::Email, Some(format!("mailto:{text}")))
    } else if ADDRESS_LINE.is_match(&text) {
        (ContactKind::Address, Some(maps_url(&text)))
    } else {
        (ContactKind::Text, None)
    };
    DetectedContact { kind, text, link }
}

fn has_digit(caps: &Captures<'_>) -> bool {
    caps.get(2)
        .is_some_and(|m| m.as_str().chars().any(|c| c.is_ascii_digit()))
}

/// Auto-link contact details in rendered HTML.
///
/// Only text between tags is scanned, and text inside an `<a>` element is
/// left alone.
pub fn enhance_contact_info_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + html.len() / 4);
    let mut anchor_depth = 0usize;
    let mut rest = html;

    while !rest.is_empty() {
        match rest.find('<') {
            Some(0) => {
                let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
                let tag = &rest[..end];
                match anchor_tag(tag) {
                    Some(true) => anchor_depth += 1,
                    Some(false) => anchor_depth = anchor_depth.saturating_sub(1),
                    None => {}
                }
                out.push_str(tag);
                rest = &rest[end..];
            }
            found => {
                let end = found.unwrap_or(rest.len());
                let text = &rest[..end];
                if anchor_depth == 0 {
                    out.push_str(&enhance_text(text));
                } else {
                    out.push_str(text);
                }
                rest = &rest[end..];
            }
        }
    }
    out
}

/// `Some(true)` for an opening `<a>`, `Some(false)` for `</a>`.
fn anchor_tag(tag: &str) -> Option<bool> {
    let inner = tag.trim_start_matches('<').trim_end_matches('>');
    let (closing, name_part) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let name: String = name_part
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    name.eq_ignore_ascii_case("a").then_some(!closing)
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Phone,
    Fax,
    Email,
    Address,
}

/// A detected span inside a text node. Byte offsets into the text.
struct Hit {
    kind: Kind,
    start: usize,
    end: usize,
    /// End of the prefix (`Tel.:`) for phone and fax.
    prefix_end: usize,
}

/// First phone or fax match at or after `from` whose number has a digit.
fn find_number(re: &Regex, kind: Kind, text: &str, from: usize) -> Option<Hit> {
    let mut pos = from;
    while pos <= text.len() {
        let caps = re.captures_at(text, pos)?;
        let whole = caps.get(0)?;
        if has_digit(&caps) {
            let prefix = caps.get(1)?;
            let number = caps.get(2)?;
            let end = number.start() + number.as_str().trim_end().len();
            return Some(Hit {
                kind,
                start: whole.start(),
                end,
                prefix_end: prefix.end(),
            });
        }
        pos = next_char_boundary(text, whole.start());
    }
    None
}

fn find_plain(re: &Regex, kind: Kind, text: &str, from: usize) -> Option<Hit> {
    let m = re.find_at(text, from)?;
    let matched = m.as_str();
    let start = m.start() + (matched.len() - matched.trim_start().len());
    let end = m.start() + matched.trim_end().len();
    (start < end).then_some(Hit {
        kind,
        start,
        end,
        prefix_end: start,
    })
}

fn next_char_boundary(text: &str, i: usize) -> usize {
    let mut next = i + 1;
    while next < text.len() && !text.is_char_boundary(next) {
        next += 1;
    }
    next
}

/// Earliest hit at or after `from`; ties go to phone, fax, email, address.
fn next_hit(text: &str, from: usize) -> Option<Hit> {
    [
        find_number(&PHONE_RE, Kind::Phone, text, from),
        find_number(&FAX_RE, Kind::Fax, text, from),
        find_plain(&EMAIL_RE, Kind::Email, text, from),
        find_plain(&ADDRESS_RE, Kind::Address, text, from),
    ]
    .into_iter()
    .flatten()
    .min_by_key(|hit| hit.start)
}

fn enhance_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(hit) = next_hit(text, pos) {
        out.push_str(&text[pos..hit.start]);
        let matched = &text[hit.start..hit.end];
        match hit.kind {
            Kind::Phone | Kind::Fax => {
                let number = &text[hit.prefix_end..hit.end];
                let icon = if matches!(hit.kind, Kind::Phone) {
                    PHONE_ICON
                } else {
                    FAX_ICON
                };
                out.push_str(&format!(
                    r#"{icon}<a href="tel:{}" class="{LINK_CLASS}">{matched}</a>"#,
                    clean_phone_number(number)
                ));
            }
            Kind::Email => {
                out.push_str(&format!(
                    r#"{EMAIL_ICON}<a href="mailto:{matched}" class="{LINK_CLASS}">{matched}</a>"#
                ));
            }
            Kind::Address => {
                out.push_str(&format!(
                    r#"{ADDRESS_ICON}<a href="{}" target="_blank" rel="noopener noreferrer" class="{LINK_CLASS}">{matched}</a>"#,
                    maps_url(matched).replace('&', "&amp;")
                ));
            }
        }
        pos = hit.end;
    }
    out.push_str(&text[pos..]);
    out
}
