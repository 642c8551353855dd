//! crates/content_ingest_core/src/fragment.rs
//!
//! An explicit document model for rich-text blocks.
//!
//! A `RichText` is an ordered list of typed inline runs. The editor surface
//! renders it and changes it only through commands such as
//! `insert_fragment_at_cursor` and `apply_style_to_selection`. Positions are
//! counted in characters; an image or a line break counts as one.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

use crate::sanitizer::{sanitizer, ClipboardPayload, SanitizedHtml};

//=========================================================================================
// Runs and Styles
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub color: Option<String>,
    pub font_size: Option<String>,
    pub font_family: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl InlineStyle {
    /// Folds one `property:value` declaration into the style.
    fn apply_declaration(&mut self, property: &str, value: &str) {
        let value = value.trim();
        match property.trim() {
            "color" => self.color = Some(value.to_string()),
            "font-size" => self.font_size = Some(value.to_string()),
            "font-family" => self.font_family = Some(value.to_string()),
            "font-weight" => {
                self.bold = value == "bold"
                    || value == "bolder"
                    || value.parse::<u16>().map(|w| w >= 600).unwrap_or(false)
            }
            "font-style" => self.italic = value == "italic" || value == "oblique",
            "text-decoration" => self.underline = value.contains("underline"),
            _ => {}
        }
    }

    /// The declarations carried by a `<span>`; emphasis is rendered with tags.
    fn css(&self) -> Option<String> {
        let mut declarations = Vec::new();
        if let Some(color) = &self.color {
            declarations.push(format!("color:{}", color));
        }
        if let Some(size) = &self.font_size {
            declarations.push(format!("font-size:{}", size));
        }
        if let Some(family) = &self.font_family {
            declarations.push(format!("font-family:{}", family));
        }
        if declarations.is_empty() {
            None
        } else {
            Some(declarations.join("; "))
        }
    }
}

/// A partial style applied over a selection. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StylePatch {
    pub color: Option<String>,
    pub font_size: Option<String>,
    pub font_family: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

impl StylePatch {
    fn apply(&self, style: &mut InlineStyle) {
        if let Some(color) = &self.color {
            style.color = Some(color.clone());
        }
        if let Some(size) = &self.font_size {
            style.font_size = Some(size.clone());
        }
        if let Some(family) = &self.font_family {
            style.font_family = Some(family.clone());
        }
        if let Some(bold) = self.bold {
            style.bold = bold;
        }
        if let Some(italic) = self.italic {
            style.italic = italic;
        }
        if let Some(underline) = self.underline {
            style.underline = underline;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineRun {
    Text { text: String, style: InlineStyle },
    Link { text: String, href: String, style: InlineStyle },
    Image { src: String, alt: String },
    LineBreak,
}

impl InlineRun {
    /// Length in characters.
    pub fn len(&self) -> usize {
        match self {
            InlineRun::Text { text, .. } | InlineRun::Link { text, .. } => text.chars().count(),
            InlineRun::Image { .. } | InlineRun::LineBreak => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits a text-bearing run at a character offset inside it.
    fn split_off(&mut self, at: usize) -> Option<InlineRun> {
        let split = |text: &mut String| {
            let byte = text.char_indices().nth(at).map(|(i, _)| i)?;
            Some(text.split_off(byte))
        };
        match self {
            InlineRun::Text { text, style } => {
                let tail = split(text)?;
                Some(InlineRun::Text { text: tail, style: style.clone() })
            }
            InlineRun::Link { text, href, style } => {
                let tail = split(text)?;
                Some(InlineRun::Link {
                    text: tail,
                    href: href.clone(),
                    style: style.clone(),
                })
            }
            _ => None,
        }
    }

    fn style_mut(&mut self) -> Option<&mut InlineStyle> {
        match self {
            InlineRun::Text { style, .. } | InlineRun::Link { style, .. } => Some(style),
            _ => None,
        }
    }

    /// Appends `next` onto `self` when both carry the same formatting.
    fn try_merge(&mut self, next: &InlineRun) -> bool {
        match (self, next) {
            (
                InlineRun::Text { text, style },
                InlineRun::Text { text: next_text, style: next_style },
            ) if style == next_style => {
                text.push_str(next_text);
                true
            }
            (
                InlineRun::Link { text, href, style },
                InlineRun::Link { text: next_text, href: next_href, style: next_style },
            ) if style == next_style && href == next_href => {
                text.push_str(next_text);
                true
            }
            _ => false,
        }
    }
}

//=========================================================================================
// The Document
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    runs: Vec<InlineRun>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a sanitized fragment into runs. Block boundaries become line breaks.
    pub fn from_html(html: &SanitizedHtml) -> Self {
        let mut doc = Self { runs: parse_runs(html.as_str()) };
        doc.coalesce();
        doc
    }

    /// Sanitizes a paste and turns it into a fragment ready for insertion.
    pub fn from_paste(payload: &ClipboardPayload) -> Self {
        Self::from_html(&sanitizer().sanitize_paste(payload))
    }

    /// A fragment holding a single inline image, e.g. one just uploaded.
    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self { runs: vec![InlineRun::Image { src: src.into(), alt: alt.into() }] }
    }

    pub fn runs(&self) -> &[InlineRun] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(InlineRun::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The text content, with line breaks as `\n` and images omitted.
    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .map(|run| match run {
                InlineRun::Text { text, .. } | InlineRun::Link { text, .. } => text.as_str(),
                InlineRun::LineBreak => "\n",
                InlineRun::Image { .. } => "",
            })
            .collect()
    }

    /// Splices `fragment` in at `cursor`, leaving the rest of the document
    /// untouched. Returns the cursor position just after the inserted content.
    pub fn insert_fragment_at_cursor(&mut self, cursor: usize, fragment: RichText) -> usize {
        let cursor = cursor.min(self.len());
        let inserted = fragment.len();
        let at = self.boundary_at(cursor);
        self.runs.splice(at..at, fragment.runs);
        self.coalesce();
        cursor + inserted
    }

    /// Sanitizes a paste and inserts it at `cursor`.
    pub fn paste(&mut self, cursor: usize, payload: &ClipboardPayload) -> usize {
        self.insert_fragment_at_cursor(cursor, Self::from_paste(payload))
    }

    /// Merges `patch` into the style of every run covered by `selection`.
    pub fn apply_style_to_selection(&mut self, selection: Range<usize>, patch: &StylePatch) {
        let len = self.len();
        let start = selection.start.min(len);
        let end = selection.end.min(len);
        if start >= end {
            return;
        }

        let first = self.boundary_at(start);
        let last = self.boundary_at(end);
        for run in &mut self.runs[first..last] {
            if let Some(style) = run.style_mut() {
                patch.apply(style);
            }
        }
        self.coalesce();
    }

    /// Renders the document back to sanitized HTML.
    pub fn to_html(&self) -> SanitizedHtml {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                InlineRun::Text { text, style } => push_styled(&mut out, &escape(text), style),
                InlineRun::Link { text, href, style } => {
                    out.push_str(&format!("<a href=\"{}\">", escape(href)));
                    push_styled(&mut out, &escape(text), style);
                    out.push_str("</a>");
                }
                InlineRun::Image { src, alt } => {
                    out.push_str(&format!(
                        "<img src=\"{}\" alt=\"{}\">",
                        escape(src),
                        escape(alt)
                    ));
                }
                InlineRun::LineBreak => out.push_str("<br>"),
            }
        }
        sanitizer().sanitize_html(&out)
    }

    /// Makes `pos` fall on a run boundary and returns the index of the run starting there.
    fn boundary_at(&mut self, pos: usize) -> usize {
        let mut offset = 0;
        for i in 0..self.runs.len() {
            if offset == pos {
                return i;
            }
            let len = self.runs[i].len();
            if pos < offset + len {
                if let Some(tail) = self.runs[i].split_off(pos - offset) {
                    self.runs.insert(i + 1, tail);
                    return i + 1;
                }
                return i;
            }
            offset += len;
        }
        self.runs.len()
    }

    fn coalesce(&mut self) {
        let mut merged: Vec<InlineRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.is_empty() {
                continue;
            }
            if let Some(last) = merged.last_mut() {
                if last.try_merge(&run) {
                    continue;
                }
            }
            merged.push(run);
        }
        self.runs = merged;
    }
}

fn push_styled(out: &mut String, text: &str, style: &InlineStyle) {
    let css = style.css();
    if let Some(css) = &css {
        out.push_str(&format!("<span style=\"{}\">", escape(css)));
    }
    if style.bold {
        out.push_str("<strong>");
    }
    if style.italic {
        out.push_str("<em>");
    }
    if style.underline {
        out.push_str("<u>");
    }
    out.push_str(text);
    if style.underline {
        out.push_str("</u>");
    }
    if style.italic {
        out.push_str("</em>");
    }
    if style.bold {
        out.push_str("</strong>");
    }
    if css.is_some() {
        out.push_str("</span>");
    }
}

//=========================================================================================
// Parsing Sanitized Markup
//=========================================================================================

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "tr", "figure",
];
const VOID_TAGS: &[&str] = &["br", "img", "hr", "wbr", "col", "area"];

fn markup_regexes() -> &'static [Regex; 2] {
    static REGEXES: OnceLock<[Regex; 2]> = OnceLock::new();
    REGEXES.get_or_init(|| {
        [
            Regex::new(r"^<(/?)([a-zA-Z][a-zA-Z0-9-]*)([^>]*)>").expect("valid tag regex"),
            Regex::new(r#"([a-zA-Z-]+)="([^"]*)""#).expect("valid attribute regex"),
        ]
    })
}

struct OpenElement {
    tag: String,
    style: InlineStyle,
    href: Option<String>,
}

/// Reads the markup the sanitizer emits: double-quoted attributes, escaped text.
fn parse_runs(html: &str) -> Vec<InlineRun> {
    let [tag_re, attr_re] = markup_regexes();
    let mut runs = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut rest = html;
    let mut trailing_block_break = false;

    while !rest.is_empty() {
        if rest.starts_with('<') {
            if let Some(caps) = tag_re.captures(rest) {
                let whole = caps.get(0).map(|m| m.as_str().len()).unwrap_or(1);
                let closing = !caps[1].is_empty();
                let tag = caps[2].to_ascii_lowercase();
                let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
                rest = &rest[whole..];

                if closing {
                    if let Some(pos) = stack.iter().rposition(|open| open.tag == tag) {
                        stack.truncate(pos);
                    }
                    if BLOCK_TAGS.contains(&tag.as_str()) && push_block_break(&mut runs) {
                        trailing_block_break = true;
                    }
                    continue;
                }

                let attr = |name: &str| {
                    attr_re
                        .captures_iter(attrs)
                        .find(|c| c[1].eq_ignore_ascii_case(name))
                        .map(|c| decode_entities(&c[2]))
                };

                match tag.as_str() {
                    "br" => {
                        runs.push(InlineRun::LineBreak);
                        trailing_block_break = false;
                    }
                    "img" => {
                        if let Some(src) = attr("src") {
                            trailing_block_break = false;
                            runs.push(InlineRun::Image {
                                src,
                                alt: attr("alt").unwrap_or_default(),
                            });
                        }
                    }
                    t if VOID_TAGS.contains(&t) || attrs.trim_end().ends_with('/') => {}
                    _ => {
                        let parent = stack.last();
                        let mut style = parent.map(|p| p.style.clone()).unwrap_or_default();
                        let mut href = parent.and_then(|p| p.href.clone());
                        match tag.as_str() {
                            "b" | "strong" => style.bold = true,
                            "i" | "em" => style.italic = true,
                            "u" | "ins" => style.underline = true,
                            "a" => href = attr("href").or(href),
                            _ => {}
                        }
                        if let Some(css) = attr("style") {
                            for declaration in css.split(';') {
                                if let Some((property, value)) = declaration.split_once(':') {
                                    style.apply_declaration(property, value);
                                }
                            }
                        }
                        stack.push(OpenElement { tag, style, href });
                    }
                }
                continue;
            }
        }

        let first = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        let end = rest[first..].find('<').map(|i| i + first).unwrap_or(rest.len());
        let text = decode_entities(&rest[..end]);
        rest = &rest[end..];

        let (style, href) = stack
            .last()
            .map(|open| (open.style.clone(), open.href.clone()))
            .unwrap_or_default();
        trailing_block_break = false;
        runs.push(match href {
            Some(href) => InlineRun::Link { text, href, style },
            None => InlineRun::Text { text, style },
        });
    }

    // A break left by the last closing block tag has nothing after it.
    if trailing_block_break {
        runs.pop();
    }
    runs
}

fn push_block_break(runs: &mut Vec<InlineRun>) -> bool {
    if !runs.is_empty() && !matches!(runs.last(), Some(InlineRun::LineBreak)) {
        runs.push(InlineRun::LineBreak);
        true
    } else {
        false
    }
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';').filter(|&i| i <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> RichText {
        RichText::from_html(&SanitizedHtml::from(html))
    }

    fn plain(text: &str) -> InlineRun {
        InlineRun::Text { text: text.to_string(), style: InlineStyle::default() }
    }

    #[test]
    fn parses_styled_runs_from_legacy_markup() {
        let doc = doc(r##"a<font color="#f00" size="7">b</font><b>c</b>"##);
        assert_eq!(
            doc.runs(),
            &[
                plain("a"),
                InlineRun::Text {
                    text: "b".into(),
                    style: InlineStyle {
                        color: Some("#f00".into()),
                        font_size: Some("48px".into()),
                        ..Default::default()
                    },
                },
                InlineRun::Text {
                    text: "c".into(),
                    style: InlineStyle { bold: true, ..Default::default() },
                },
            ]
        );
    }

    #[test]
    fn links_images_and_breaks_are_typed_runs() {
        let doc = doc(concat!(
            r#"<p>see <a href="https://x.test/a?b=1&amp;c=2">here</a></p>"#,
            r#"<p><img src="https://cdn/i.png" alt="pic"></p>"#,
        ));
        assert_eq!(
            doc.runs(),
            &[
                plain("see "),
                InlineRun::Link {
                    text: "here".into(),
                    href: "https://x.test/a?b=1&c=2".into(),
                    style: InlineStyle::default(),
                },
                InlineRun::LineBreak,
                InlineRun::Image { src: "https://cdn/i.png".into(), alt: "pic".into() },
            ]
        );
    }

    #[test]
    fn entities_are_decoded_into_text() {
        let doc = doc("1 &lt; 2 &amp;&amp; 3 &gt; 2");
        assert_eq!(doc.plain_text(), "1 < 2 && 3 > 2");
    }

    #[test]
    fn inserts_at_cursor_without_replacing_the_surface() {
        let mut surface = doc("Hello world");
        let cursor = surface.insert_fragment_at_cursor(6, doc("<b>big</b> "));
        assert_eq!(cursor, 10);
        assert_eq!(surface.plain_text(), "Hello big world");
        assert_eq!(surface.runs().len(), 3);
    }

    #[test]
    fn cursor_past_the_end_appends() {
        let mut surface = doc("abc");
        let cursor = surface.insert_fragment_at_cursor(99, doc("def"));
        assert_eq!(cursor, 6);
        assert_eq!(surface.runs(), &[plain("abcdef")]);
    }

    #[test]
    fn paste_sanitizes_before_inserting() {
        let mut surface = doc("ab");
        surface.paste(1, &ClipboardPayload::html("<script>x()</script><i>Z</i>"));
        assert_eq!(surface.plain_text(), "aZb");
        assert!(!surface.to_html().as_str().contains("script"));
    }

    #[test]
    fn plain_text_paste_keeps_markup_literal() {
        let mut surface = RichText::new();
        surface.paste(0, &ClipboardPayload::text("<b>not bold</b>"));
        assert_eq!(surface.runs(), &[plain("<b>not bold</b>")]);
    }

    #[test]
    fn styling_a_selection_splits_runs() {
        let mut surface = doc("abcdef");
        surface.apply_style_to_selection(
            2..4,
            &StylePatch { bold: Some(true), color: Some("red".into()), ..Default::default() },
        );
        assert_eq!(surface.runs().len(), 3);
        assert_eq!(
            surface.to_html().as_str(),
            r#"ab<span style="color:red"><strong>cd</strong></span>ef"#
        );
    }

    #[test]
    fn unstyling_merges_runs_back() {
        let mut surface = doc("ab<u>cd</u>ef");
        surface.apply_style_to_selection(
            0..6,
            &StylePatch { underline: Some(false), ..Default::default() },
        );
        assert_eq!(surface.runs(), &[plain("abcdef")]);
    }

    #[test]
    fn empty_selection_is_a_no_op() {
        let mut surface = doc("abc");
        let before = surface.clone();
        let bold = StylePatch { bold: Some(true), ..Default::default() };
        surface.apply_style_to_selection(2..2, &bold);
        assert_eq!(surface, before);
    }

    #[test]
    fn rendering_round_trips_through_the_parser() {
        let original = doc(r#"x<span style="font-size:18px"><em>y</em></span><br>z"#);
        assert_eq!(RichText::from_html(&original.to_html()), original);
    }
}
