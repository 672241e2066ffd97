use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a").expect("valid selector");
}

/// Elements whose text is never shown to a reader.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("empty document")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// A parsed HTML page.
pub struct Document {
    html: Html,
}

impl Document {
    /// Bytes are decoded as UTF-8, replacing invalid sequences.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ParseError::Empty);
        }
        let body = String::from_utf8_lossy(bytes);
        Ok(Self { html: Html::parse_document(&body) })
    }

    /// All visible text, one leaf text node per line.
    pub fn text(&self) -> String { text_only(self.html.root_element()) }

    /// Every `<a>` element that carries an `href`, in document order.
    pub fn anchors(&self) -> Vec<Anchor> {
        self.html
            .select(&ANCHOR)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                Some(Anchor { href: href.to_string(), text: text_only(a) })
            })
            .collect()
    }
}

/// Concatenate the trimmed leaf text under `element`, with a newline after
/// each child.
pub fn text_only(element: ElementRef<'_>) -> String {
    if HIDDEN.contains(&element.value().name()) {
        return String::new();
    }
    let mut out = String::new();
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text.trim());
        } else if let Some(el) = ElementRef::wrap(child) {
            out.push_str(&text_only(el));
        } else {
            continue;
        }
        out.push('\n');
    }
    out
}
