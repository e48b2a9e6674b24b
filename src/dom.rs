//! Typed HTML access on top of `scraper`.
//!
//! Every lookup returns an `Option` or a (possibly empty) `Vec`; a missing
//! element or attribute is a value, not a runtime failure. `Html` is not
//! `Send`, so documents live only inside synchronous parse functions and are
//! never held across an `.await`.

use crate::error::{LeadsError, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compile a CSS selector, mapping failures to [`LeadsError::Parse`].
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| LeadsError::Parse(format!("Invalid selector '{}': {}", css, e)))
}

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// All elements matching `css`, in document order.
    ///
    /// An invalid selector yields no nodes.
    pub fn select(&self, css: &str) -> Vec<Node<'_>> {
        match selector(css) {
            Ok(sel) => self.html.select(&sel).map(Node).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn select_first(&self, css: &str) -> Option<Node<'_>> {
        let sel = selector(css).ok()?;
        self.html.select(&sel).next().map(Node)
    }

    /// Every element of the document in pre-order.
    pub fn elements(&self) -> impl Iterator<Item = Node<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(Node)
    }

    /// Elements that start after `anchor` in document order, including its
    /// own descendants.
    pub fn elements_after<'a>(&'a self, anchor: Node<'a>) -> impl Iterator<Item = Node<'a>> + 'a {
        self.elements().skip_while(move |n| n.0 != anchor.0).skip(1)
    }

    /// Parent element of the first text node containing `needle`, ignoring
    /// script and style content.
    pub fn first_text_containing(&self, needle: &str) -> Option<Node<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter(|n| n.value().as_text().is_some_and(|t| t.contains(needle)))
            .filter_map(|n| n.parent().and_then(ElementRef::wrap))
            .find(|parent| !matches!(parent.value().name(), "script" | "style"))
            .map(Node)
    }

    /// Trimmed `<title>` text, used for log context.
    pub fn title(&self) -> Option<String> {
        self.select_first("title").map(|n| n.text()).filter(|t| !t.is_empty())
    }
}

/// An element inside a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    /// Concatenated, trimmed text of this element and its descendants.
    pub fn text(&self) -> String {
        self.raw_text().trim().to_string()
    }

    /// Concatenated text with original whitespace and line breaks.
    pub fn raw_text(&self) -> String {
        self.0.text().collect::<String>()
    }

    /// Non-blank text pieces, trimmed and joined by single spaces.
    pub fn spaced_text(&self) -> String {
        self.0
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    pub fn tag(&self) -> &'a str {
        self.0.value().name()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0.value().classes().any(|c| c == class)
    }

    pub fn select(&self, css: &str) -> Vec<Node<'a>> {
        match selector(css) {
            Ok(sel) => self.0.select(&sel).map(Node).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn select_first(&self, css: &str) -> Option<Node<'a>> {
        let sel = selector(css).ok()?;
        self.0.select(&sel).next().map(Node)
    }

    /// Following sibling elements.
    pub fn next_element_siblings(&self) -> impl Iterator<Item = Node<'a>> {
        self.0.next_siblings().filter_map(ElementRef::wrap).map(Node)
    }

    /// `href` of this element, or of its first descendant anchor.
    pub fn link(&self) -> Option<&'a str> {
        self.attribute("href")
            .or_else(|| self.select_first("a[href]").and_then(|a| a.attribute("href")))
            .filter(|href| !href.trim().is_empty())
    }
}

/// Resolve `href` against `base`, returning an absolute URL string.
pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(href) {
        return Some(url.to_string());
    }
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
