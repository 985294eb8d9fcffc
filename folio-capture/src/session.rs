//! The browser session seam.
//!
//! Everything the engine needs from a rendering engine goes through
//! [`BrowserSession`]: navigation, DOM queries and page-to-PDF rendering.
//! [`crate::chrome`] provides the real implementation; the `fake` module
//! provides a scripted one for tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use url::Url;

use crate::error::Result;

/// How to locate elements on the current document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A CSS selector, e.g. `a`, `h1`, `.rich_media_title`.
    Css(String),
    /// Any element whose own text contains the literal.
    TextContains(String),
    /// An anchor whose visible text contains the literal.
    LinkText(String),
}

impl Selector {
    pub fn css(selector: impl Into<String>) -> Self {
        Selector::Css(selector.into())
    }

    pub fn text_contains(text: impl Into<String>) -> Self {
        Selector::TextContains(text.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Selector::LinkText(text.into())
    }
}

/// A detached snapshot of a DOM element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Nearest ancestor carrying an `href`, if any.
    #[serde(default)]
    pub parent: Option<Box<Element>>,
}

impl Element {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent: Element) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Attribute value, `None` when absent or blank.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The element's `href`, falling back to its nearest linked ancestor.
    pub fn href_or_parent(&self) -> Option<&str> {
        self.attr("href")
            .or_else(|| self.parent.as_deref().and_then(|p| p.attr("href")))
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

/// Page layout handed to the renderer. Dimensions are in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub landscape: bool,
    pub display_header_footer: bool,
    pub print_background: bool,
    pub prefer_css_page_size: bool,
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub scale: f64,
}

impl PageLayout {
    pub const A4_WIDTH: f64 = 8.27;
    pub const A4_HEIGHT: f64 = 11.69;

    /// A4 portrait, backgrounds on, no margins, CSS page size preferred.
    pub fn a4_portrait() -> Self {
        Self {
            landscape: false,
            display_header_footer: false,
            print_background: true,
            prefer_css_page_size: true,
            paper_width: Self::A4_WIDTH,
            paper_height: Self::A4_HEIGHT,
            margin_top: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            margin_right: 0.0,
            scale: 1.0,
        }
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::a4_portrait()
    }
}

/// One rendering engine instance holding one current document.
pub trait BrowserSession: Send + Sync + Sized {
    /// Load `url` as the current document.
    fn navigate(&mut self, url: &Url) -> impl Future<Output = Result<()>> + Send;

    /// All matching elements in document order.
    fn query_all(&self, selector: &Selector) -> impl Future<Output = Result<Vec<Element>>> + Send;

    /// First matching element.
    fn query(&self, selector: &Selector) -> impl Future<Output = Result<Option<Element>>> + Send {
        async move { Ok(self.query_all(selector).await?.into_iter().next()) }
    }

    /// The document's `<title>` metadata.
    fn document_title(&self) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Render the current document. `None` means the renderer produced no data.
    fn render_pdf(&self, layout: &PageLayout)
    -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Tear the engine down.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Creates sessions, one per seed worker.
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession;

    fn launch(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_ignores_blank_values() {
        let el = Element::with_text("x").with_attr("href", "   ");
        assert_eq!(el.attr("href"), None);
        assert_eq!(el.attr("missing"), None);
    }

    #[test]
    fn test_href_falls_back_to_parent() {
        let el = Element::with_text("访问文章")
            .with_parent(Element::default().with_attr("href", "https://example.com/new"));
        assert_eq!(el.href_or_parent(), Some("https://example.com/new"));

        let own = Element::with_text("go")
            .with_attr("href", "https://example.com/own")
            .with_parent(Element::default().with_attr("href", "https://example.com/new"));
        assert_eq!(own.href_or_parent(), Some("https://example.com/own"));
    }

    #[test]
    fn test_default_layout_is_a4_portrait() {
        let layout = PageLayout::default();
        assert!(!layout.landscape);
        assert!(layout.print_background);
        assert!(layout.prefer_css_page_size);
        assert_eq!(layout.margin_top, 0.0);
        assert!((layout.paper_width - 8.27).abs() < f64::EPSILON);
        assert!((layout.paper_height - 11.69).abs() < f64::EPSILON);
    }

    #[test]
    fn test_element_decodes_partial_snapshot() {
        let el: Element = serde_json::from_str(r#"{"text":"Hi"}"#).unwrap();
        assert_eq!(el.text, "Hi");
        assert!(el.attributes.is_empty());
        assert!(el.parent.is_none());
    }
}
