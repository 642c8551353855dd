//! crates/content_ingest_core/src/sanitizer.rs
//!
//! Normalizes pasted or edited HTML before it is stored in a text block.
//!
//! Legacy `<font>` markup is rewritten into styled `<span>` wrappers first, then
//! `script` and `style` elements are dropped together with their content. Any
//! other element passes through with its attributes, minus event handlers,
//! unsafe URL schemes and the handful of document-level tags listed below.
//! Sanitizing never fails.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

/// Pixel sizes for the legacy `size` codes 1 through 7.
const FONT_SIZES: [&str; 7] = ["10px", "13px", "16px", "18px", "24px", "32px", "48px"];
const DEFAULT_FONT_SIZE: &str = "16px";

/// Inline style properties that survive sanitizing.
const ALLOWED_STYLE_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "font-size",
    "font-family",
    "font-weight",
    "font-style",
    "text-decoration",
    "text-align",
];

/// Removed together with everything inside them.
const CLEAN_CONTENT_TAGS: &[&str] = &["script", "style"];

/// Dropped while their children are kept. `font` only survives the rewrite
/// when it is malformed; the rest describe a document rather than a fragment
/// or would change how the page resolves and executes.
const UNWRAPPED_TAGS: &[&str] = &[
    "font", "html", "head", "body", "title", "meta", "link", "base", "noscript", "template",
    "svg", "math",
];

/// Embeds and layout tags pasted from other editors.
const PASS_THROUGH_TAGS: &[&str] = &[
    "span", "figure", "figcaption", "iframe", "video", "audio", "source", "track", "picture",
    "section", "article", "header", "footer", "nav", "aside", "main", "mark", "time",
];

const PASS_THROUGH_ATTRIBUTES: &[&str] = &[
    "style", "class", "id", "width", "height", "controls", "poster", "allow",
    "allowfullscreen", "frameborder", "loading", "type",
];

//=========================================================================================
// Sanitized Output
//=========================================================================================

/// An HTML fragment that has been through the sanitizer.
///
/// Converting from a `String` (including deserializing one) sanitizes it, so a
/// value of this type never holds unsafe markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SanitizedHtml(String);

impl SanitizedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for SanitizedHtml {
    fn from(raw: String) -> Self {
        sanitizer().sanitize_html(&raw)
    }
}

impl From<&str> for SanitizedHtml {
    fn from(raw: &str) -> Self {
        sanitizer().sanitize_html(raw)
    }
}

impl From<SanitizedHtml> for String {
    fn from(html: SanitizedHtml) -> Self {
        html.0
    }
}

impl fmt::Display for SanitizedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a paste event offers: an optional HTML flavor and the plain-text flavor.
#[derive(Debug, Clone, Default)]
pub struct ClipboardPayload {
    pub html: Option<String>,
    pub text: String,
}

impl ClipboardPayload {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            text: String::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            html: None,
            text: text.into(),
        }
    }
}

//=========================================================================================
// The Sanitizer
//=========================================================================================

/// Stateless; the allow-list is rebuilt per fragment from the names it contains.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSanitizer;

impl ContentSanitizer {
    pub const fn new() -> Self {
        ContentSanitizer
    }

    /// Sanitizes a raw HTML fragment.
    pub fn sanitize_html(&self, html: &str) -> SanitizedHtml {
        let rewritten = rewrite_font_tags(html);
        let (tags, attributes) = markup_names(&rewritten);

        let mut cleaner = ammonia::Builder::default();
        cleaner
            .strip_comments(true)
            .add_tags(PASS_THROUGH_TAGS)
            .add_tags(&tags)
            .rm_tags(UNWRAPPED_TAGS)
            .add_generic_attributes(PASS_THROUGH_ATTRIBUTES)
            .add_generic_attributes(&attributes)
            .add_clean_content_tags(CLEAN_CONTENT_TAGS)
            .link_rel(Some("noopener noreferrer"))
            .attribute_filter(|_element, attribute, value| {
                if attribute == "style" {
                    filter_style(value).map(Cow::Owned)
                } else {
                    Some(Cow::Borrowed(value))
                }
            });
        SanitizedHtml(cleaner.clean(&rewritten).to_string())
    }

    /// Sanitizes a paste, falling back to the plain-text flavor when there is
    /// no usable HTML.
    pub fn sanitize_paste(&self, payload: &ClipboardPayload) -> SanitizedHtml {
        match payload.html.as_deref() {
            Some(html) if !html.trim().is_empty() => self.sanitize_html(html),
            _ => Self::plain_text(&payload.text),
        }
    }

    /// Escapes every character of `text`; line breaks become `<br>`.
    pub fn plain_text(text: &str) -> SanitizedHtml {
        let escaped: Vec<String> = text
            .split('\n')
            .map(|line| ammonia::clean_text(line.trim_end_matches('\r')))
            .collect();
        SanitizedHtml(escaped.join("<br>"))
    }
}

/// The process-wide sanitizer.
pub fn sanitizer() -> &'static ContentSanitizer {
    static SANITIZER: ContentSanitizer = ContentSanitizer::new();
    &SANITIZER
}

//=========================================================================================
// Pass-Through Names
//=========================================================================================

fn markup_regexes() -> &'static [Regex; 2] {
    static REGEXES: OnceLock<[Regex; 2]> = OnceLock::new();
    REGEXES.get_or_init(|| {
        [
            Regex::new(r"<\s*([a-zA-Z][a-zA-Z0-9-]*)([^>]*)>").expect("valid element regex"),
            Regex::new(r"(?:^|\s)([a-zA-Z_][a-zA-Z0-9_.-]*)").expect("valid attribute name regex"),
        ]
    })
}

/// Element and attribute names in `html` that may pass through, lowercased.
///
/// Attribute scanning also picks up words inside quoted values; allowing a
/// name that no element carries has no effect.
fn markup_names(html: &str) -> (BTreeSet<String>, BTreeSet<String>) {
    let [element, attribute] = markup_regexes();
    let mut tags = BTreeSet::new();
    let mut attributes = BTreeSet::new();

    for caps in element.captures_iter(html) {
        let tag = caps[1].to_ascii_lowercase();
        if !CLEAN_CONTENT_TAGS.contains(&tag.as_str()) && !UNWRAPPED_TAGS.contains(&tag.as_str())
        {
            tags.insert(tag);
        }
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        for name in attribute.captures_iter(body) {
            let name = name[1].to_ascii_lowercase();
            if is_passable_attribute(&name) {
                attributes.insert(name);
            }
        }
    }
    (tags, attributes)
}

/// Event handlers, inline documents and `rel` (set by the link policy) never pass.
fn is_passable_attribute(name: &str) -> bool {
    !(name.starts_with("on") || name == "srcdoc" || name == "rel")
}

//=========================================================================================
// Legacy <font> Rewriting
//=========================================================================================

fn font_regexes() -> &'static [Regex; 3] {
    static REGEXES: OnceLock<[Regex; 3]> = OnceLock::new();
    REGEXES.get_or_init(|| {
        [
            Regex::new(r"(?i)<\s*font(\s[^>]*)?>").expect("valid font open regex"),
            Regex::new(r"(?i)<\s*/\s*font\s*>").expect("valid font close regex"),
            Regex::new(
                r#"(?i)(?:^|\s)(color|size|face)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            )
            .expect("valid font attribute regex"),
        ]
    })
}

/// Maps a legacy `size` code to its pixel size.
pub fn font_size_px(code: &str) -> &'static str {
    code.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=FONT_SIZES.len()).contains(n))
        .map(|n| FONT_SIZES[n - 1])
        .unwrap_or(DEFAULT_FONT_SIZE)
}

/// Turns every `<font color size face>` into `<span style="...">`, keeping children.
fn rewrite_font_tags(html: &str) -> String {
    let [open, close, attr] = font_regexes();

    let opened = open.replace_all(html, |caps: &Captures| {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let mut color = None;
        let mut size = None;
        let mut face = None;
        for a in attr.captures_iter(attrs) {
            let value = a
                .get(2)
                .or_else(|| a.get(3))
                .or_else(|| a.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match a[1].to_ascii_lowercase().as_str() {
                "color" => color = Some(value),
                "size" => size = Some(value),
                _ => face = Some(value),
            }
        }

        let mut declarations = Vec::new();
        if let Some(color) = color.map(clean_css_value).filter(|v| !v.is_empty()) {
            declarations.push(format!("color:{}", color));
        }
        if let Some(size) = size {
            declarations.push(format!("font-size:{}", font_size_px(size)));
        }
        if let Some(face) = face.map(clean_css_value).filter(|v| !v.is_empty()) {
            declarations.push(format!("font-family:{}", face));
        }

        if declarations.is_empty() {
            "<span>".to_string()
        } else {
            format!("<span style=\"{}\">", declarations.join("; "))
        }
    });

    close.replace_all(&opened, "</span>").into_owned()
}

/// Drops characters that could end a declaration or an attribute.
fn clean_css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | ':' | '"' | '\'' | '<' | '>' | '{' | '}' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Keeps only allow-listed declarations with inert values.
fn filter_style(style: &str) -> Option<String> {
    let kept: Vec<String> = style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            if value.is_empty() || !ALLOWED_STYLE_PROPERTIES.contains(&property.as_str()) {
                return None;
            }
            let lowered = value.to_ascii_lowercase();
            if lowered.contains("url(")
                || lowered.contains("expression(")
                || lowered.contains("javascript:")
            {
                return None;
            }
            Some(format!("{}:{}", property, value))
        })
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("; "))
    }
}
