//! HTML → text extraction strategies.
//!
//! Extraction is an ordered list of [`ExtractionStrategy`] values tried in
//! sequence; the first non-empty output wins. [`ExtractionStrategy::Paragraphs`]
//! walks a parsed DOM with CSS selectors. [`ExtractionStrategy::TagScan`]
//! works on the raw markup with regular expressions and covers documents the
//! DOM pass cannot use, such as pages whose text lives outside paragraph
//! elements or markup cut short by the byte cap.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, SearchError};

/// Paragraph-like elements read by the DOM strategy.
const PARAGRAPH_SELECTOR: &str = "p, blockquote, pre, li";

/// Containers whose text is page furniture rather than content.
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "svg", "iframe", "form",
];

/// Fragments shorter than this (in chars) are labels, not prose.
const MIN_FRAGMENT_CHARS: usize = 20;

/// Limits applied while extracting text from one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    /// Maximum characters returned.
    pub text_limit: usize,
    /// Maximum paragraph-like elements collected.
    pub max_paragraphs: usize,
}

impl TextLimits {
    /// Collection stops once this many characters are gathered: the target
    /// plus 20%, so a long final paragraph does not leave the result short.
    pub fn overshoot(&self) -> usize {
        self.text_limit.saturating_add(self.text_limit / 5)
    }
}

/// One way of turning HTML into readable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Parse the document and collect paragraph-like elements.
    Paragraphs,
    /// Strip tags from the raw markup with pattern matching.
    TagScan,
}

impl ExtractionStrategy {
    /// Strategies in the order they are attempted.
    pub const ORDER: [Self; 2] = [Self::Paragraphs, Self::TagScan];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Paragraphs => "paragraphs",
            Self::TagScan => "tag-scan",
        }
    }

    /// Run this strategy. An empty string means it found nothing usable.
    pub fn apply(&self, html: &str, limits: TextLimits) -> Result<String> {
        let fragments = match self {
            Self::Paragraphs => paragraph_fragments(html, limits)?,
            Self::TagScan => tag_scan_fragments(html, limits),
        };
        Ok(truncate_chars(&fragments.join("\n\n"), limits.text_limit))
    }
}

/// Extract readable text from `html`, trying each strategy in order.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if no strategy produced any text.
pub fn extract_text(html: &str, limits: TextLimits) -> Result<String> {
    for strategy in ExtractionStrategy::ORDER {
        match strategy.apply(html, limits) {
            Ok(text) if !text.is_empty() => {
                tracing::trace!(
                    strategy = strategy.name(),
                    chars = text.chars().count(),
                    "text extracted"
                );
                return Ok(text);
            }
            Ok(_) => {
                tracing::trace!(strategy = strategy.name(), "strategy found no text");
            }
            Err(err) => {
                tracing::trace!(strategy = strategy.name(), error = %err, "strategy failed");
            }
        }
    }
    Err(SearchError::Parse("no extractable content found".into()))
}

fn paragraph_fragments(html: &str, limits: TextLimits) -> Result<Vec<String>> {
    let selector = Selector::parse(PARAGRAPH_SELECTOR)
        .map_err(|e| SearchError::Parse(format!("invalid paragraph selector: {e:?}")))?;
    let document = Html::parse_document(html);

    let mut fragments = Vec::new();
    let mut gathered = 0usize;
    for element in document.select(&selector) {
        if fragments.len() >= limits.max_paragraphs || gathered > limits.overshoot() {
            break;
        }
        if has_excluded_ancestor(&element) {
            continue;
        }
        let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        let chars = text.chars().count();
        if chars < MIN_FRAGMENT_CHARS {
            continue;
        }
        gathered += chars;
        fragments.push(text);
    }
    Ok(fragments)
}

/// True for elements nested in boilerplate, or inside another
/// paragraph-like element whose text already includes theirs.
fn has_excluded_ancestor(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value().as_element().is_some_and(|el| {
            let name = el.name();
            BOILERPLATE_TAGS.contains(&name) || matches!(name, "p" | "blockquote" | "pre" | "li")
        })
    })
}

struct ScanPatterns {
    /// Each matches through the closing tag, or to end of input when the
    /// byte cap cut the element open.
    boilerplate: Vec<Regex>,
    head: Regex,
    comment: Regex,
    paragraph: Regex,
    tag: Regex,
    entity: Regex,
}

fn scan_patterns() -> Option<&'static ScanPatterns> {
    static PATTERNS: OnceLock<Option<ScanPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            let boilerplate = BOILERPLATE_TAGS
                .iter()
                .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?(?:</{tag}\s*>|\z)")))
                .collect::<std::result::Result<Vec<_>, _>>()
                .ok()?;
            Some(ScanPatterns {
                boilerplate,
                head: Regex::new(r"(?is)<head\b[^>]*>.*?(?:</head\s*>|\z)").ok()?,
                comment: Regex::new(r"(?s)<!--.*?-->").ok()?,
                paragraph: Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").ok()?,
                tag: Regex::new(r"(?s)<[^>]*>").ok()?,
                entity: Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,6});").ok()?,
            })
        })
        .as_ref()
}

fn tag_scan_fragments(html: &str, limits: TextLimits) -> Vec<String> {
    let Some(patterns) = scan_patterns() else {
        return Vec::new();
    };

    let mut cleaned = patterns.comment.replace_all(html, " ").into_owned();
    for pattern in &patterns.boilerplate {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }

    let to_text = |markup: &str| {
        let stripped = patterns.tag.replace_all(markup, " ");
        collapse_whitespace(&decode_entities(&patterns.entity, &stripped))
    };

    let mut fragments = Vec::new();
    let mut gathered = 0usize;
    for caps in patterns.paragraph.captures_iter(&cleaned) {
        if fragments.len() >= limits.max_paragraphs || gathered > limits.overshoot() {
            break;
        }
        let text = to_text(caps.get(1).map_or("", |m| m.as_str()));
        let chars = text.chars().count();
        if chars < MIN_FRAGMENT_CHARS {
            continue;
        }
        gathered += chars;
        fragments.push(text);
    }

    if fragments.is_empty() {
        let body = patterns.head.replace_all(&cleaned, " ");
        let text = to_text(&body);
        if !text.is_empty() {
            fragments.push(text);
        }
    }
    fragments
}

/// Decode the common named entities and numeric character references.
/// Unknown named entities are left as written.
fn decode_entities(pattern: &Regex, text: &str) -> String {
    pattern
        .replace_all(text, |caps: &Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body
                .strip_prefix("#x")
                .or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_owned(), String::from)
        })
        .into_owned()
}

/// Collapse every whitespace run (including newlines) to one space.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters, never splitting a char.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].trim_end().to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: TextLimits = TextLimits {
        text_limit: 2000,
        max_paragraphs: 40,
    };

    fn article(paragraphs: usize) -> String {
        let body: String = (0..paragraphs)
            .map(|i| {
                format!("<p>Paragraph number {i} explains ownership and borrowing in Rust.</p>")
            })
            .collect();
        format!("<html><head><title>T</title></head><body><article>{body}</article></body></html>")
    }

    #[test]
    fn extracts_paragraphs_in_order() {
        let text = extract_text(&article(3), LIMITS).expect("should extract");
        let parts: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].starts_with("Paragraph number 0"));
        assert!(parts[2].starts_with("Paragraph number 2"));
    }

    #[test]
    fn skips_short_fragments() {
        let html = "<body><p>Menu</p><p>This paragraph is long enough to be real content.</p></body>";
        let text = extract_text(html, LIMITS).expect("should extract");
        assert!(!text.contains("Menu"));
        assert!(text.contains("long enough"));
    }

    #[test]
    fn ignores_boilerplate_containers() {
        let html = r#"<body>
            <nav><li>Navigation link that is quite long indeed</li></nav>
            <footer><p>Footer copyright text that is long enough</p></footer>
            <main><p>Main body text that a reader actually wants.</p></main>
        </body>"#;
        let text = extract_text(html, LIMITS).expect("should extract");
        assert!(text.contains("Main body text"));
        assert!(!text.contains("Navigation"));
        assert!(!text.contains("Footer"));
    }

    #[test]
    fn nested_paragraphs_not_duplicated() {
        let html = "<body><blockquote><p>Quoted wisdom about lifetimes and scopes.</p></blockquote></body>";
        let text = extract_text(html, LIMITS).expect("should extract");
        assert_eq!(text.matches("Quoted wisdom").count(), 1);
    }

    #[test]
    fn respects_paragraph_limit() {
        let limits = TextLimits {
            text_limit: 100_000,
            max_paragraphs: 2,
        };
        let text = extract_text(&article(10), limits).expect("should extract");
        assert_eq!(text.split("\n\n").count(), 2);
    }

    #[test]
    fn stops_collecting_past_overshoot() {
        let limits = TextLimits {
            text_limit: 100,
            max_paragraphs: 40,
        };
        let fragments = paragraph_fragments(&article(20), limits).expect("should parse");
        // Each fragment is ~60 chars; collection stops once > 120 gathered.
        assert!(fragments.len() <= 3);
    }

    #[test]
    fn output_never_exceeds_text_limit() {
        let limits = TextLimits {
            text_limit: 150,
            max_paragraphs: 40,
        };
        let text = extract_text(&article(20), limits).expect("should extract");
        assert!(text.chars().count() <= 150);
        assert!(!text.is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "ééééé";
        assert_eq!(truncate_chars(text, 3), "ééé");
        assert_eq!(truncate_chars(text, 10), text);
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn entities_decoded_in_paragraph_text() {
        let html = "<p>Fish &amp; chips &lt;served&gt; with a &quot;smile&quot; today</p>";
        let text = extract_text(html, LIMITS).expect("should extract");
        assert_eq!(text, "Fish & chips <served> with a \"smile\" today");
    }

    #[test]
    fn whitespace_collapsed() {
        let html = "<p>Lots   of\n\n\t spacing    inside this single paragraph</p>";
        let text = extract_text(html, LIMITS).expect("should extract");
        assert_eq!(text, "Lots of spacing inside this single paragraph");
    }

    #[test]
    fn falls_back_to_tag_scan_without_paragraphs() {
        let html = r#"<html><body><div class="content">
            <span>Text that lives only in divs and spans &amp; friends.</span>
            </div><script>var tracking = true;</script></body></html>"#;
        let text = extract_text(html, LIMITS).expect("should extract");
        assert_eq!(text, "Text that lives only in divs and spans & friends.");
    }

    #[test]
    fn tag_scan_prefers_paragraph_markup() {
        let html = "<div>Sidebar words that are not a paragraph</div>\
                    <p>A <b>bold</b> paragraph found by the pattern scan.</p>";
        let fragments = tag_scan_fragments(html, LIMITS);
        assert_eq!(fragments, vec!["A bold paragraph found by the pattern scan."]);
    }

    #[test]
    fn tag_scan_strips_boilerplate_and_comments() {
        let html = "<style>.x{color:red}</style><!-- hidden --><nav>Menu</nav>Visible body text";
        let fragments = tag_scan_fragments(html, LIMITS);
        assert_eq!(fragments, vec!["Visible body text"]);
    }

    #[test]
    fn decodes_numeric_entities() {
        let Some(patterns) = scan_patterns() else {
            panic!("patterns should compile");
        };
        assert_eq!(decode_entities(&patterns.entity, "&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities(&patterns.entity, "caf&#233;"), "café");
        assert_eq!(decode_entities(&patterns.entity, "&bogus; &nbsp;x"), "&bogus;  x");
    }

    #[test]
    fn empty_document_is_parse_error() {
        let err = extract_text("", LIMITS).unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn script_only_document_is_parse_error() {
        let html = "<html><head><script>var x = 1;</script><style>p{}</style></head><body></body></html>";
        assert!(extract_text(html, LIMITS).is_err());
    }

    #[test]
    fn script_cut_by_byte_cap_is_parse_error() {
        let html = "<html><head><title>Shop Home</title><script>window.__STATE__ = {\"user\":null}; \
                    function track(e){return analytics.push(e);} \
                    var config = {apiKey: 'abc', region: 'eu-west'};";
        let err = extract_text(html, LIMITS).unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn tag_scan_drops_unclosed_script() {
        let html = "<body><div>Body text that sits outside paragraphs</div><script>var state = {";
        let fragments = tag_scan_fragments(html, LIMITS);
        assert_eq!(fragments, vec!["Body text that sits outside paragraphs"]);
    }

    #[test]
    fn tag_scan_fallback_ignores_head() {
        let html = "<html><head><title>Site title</title><meta charset=utf-8></head>\
                    <body><div>Article text in a plain div</div></body></html>";
        let fragments = tag_scan_fragments(html, LIMITS);
        assert_eq!(fragments, vec!["Article text in a plain div"]);
    }

    #[test]
    fn truncated_markup_still_yields_text() {
        let html = article(5);
        let cut = &html[..html.len() / 2];
        let text = extract_text(cut, LIMITS).expect("should extract");
        assert!(text.contains("Paragraph number 0"));
    }

    #[test]
    fn overshoot_is_twenty_percent() {
        let limits = TextLimits {
            text_limit: 1000,
            max_paragraphs: 1,
        };
        assert_eq!(limits.overshoot(), 1200);
    }
}
