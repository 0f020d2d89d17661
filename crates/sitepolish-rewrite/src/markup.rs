//! Markup documents.
//!
//! A [`MarkupDocument`] owns the text of one HTML file. Tree operations are
//! answered by streaming that text through `lol_html`, so bytes outside an
//! edited element are preserved verbatim and a document nobody edited
//! serializes to exactly its input.

use lol_html::{RewriteStrSettings, Selector, element, html_content::Element, rewrite_str};
use regex::{NoExpand, Regex};
use thiserror::Error;

/// Markup errors.
#[derive(Debug, Error)]
pub enum MarkupError {
    /// Input is not a usable HTML document.
    #[error("malformed markup: {0}")]
    Malformed(String),

    /// A selector could not be parsed.
    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    /// The rewriter failed while streaming the document.
    #[error("rewrite failed: {0}")]
    Rewrite(String),
}

/// Result type for markup operations.
pub type Result<T> = std::result::Result<T, MarkupError>;

/// Error type element callbacks may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Snapshot of one matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    /// Lowercase tag name.
    pub tag: String,

    /// Attributes in source order.
    pub attributes: Vec<(String, String)>,
}

impl ElementInfo {
    /// Value of an attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether an attribute is present.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// One HTML document under edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupDocument {
    html: String,
}

impl MarkupDocument {
    /// Parse document text.
    ///
    /// Text without a single element, or that the rewriter cannot stream
    /// unambiguously, is rejected as malformed.
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let doc = Self { html: text.into() };
        let elements = doc.find_all("*").map_err(|e| match e {
            MarkupError::Rewrite(message) => MarkupError::Malformed(message),
            other => other,
        })?;
        if elements.is_empty() {
            return Err(MarkupError::Malformed("no elements found".to_string()));
        }
        Ok(doc)
    }

    /// Parse raw file bytes, which must be UTF-8.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let text = String::from_utf8(bytes)
            .map_err(|e| MarkupError::Malformed(format!("not valid UTF-8: {e}")))?;
        Self::parse(text)
    }

    /// Serialized document text.
    pub fn as_str(&self) -> &str {
        &self.html
    }

    /// Consume the document, returning its text.
    pub fn into_string(self) -> String {
        self.html
    }

    /// Whether the serialized text contains a substring.
    pub fn contains(&self, needle: &str) -> bool {
        self.html.contains(needle)
    }

    /// All elements matching a CSS selector, in document order.
    pub fn find_all(&self, selector: &str) -> Result<Vec<ElementInfo>> {
        parse_selector(selector)?;

        let mut found = Vec::new();
        rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![element!(selector, |el| {
                    found.push(ElementInfo {
                        tag: el.tag_name(),
                        attributes: el
                            .attributes()
                            .iter()
                            .map(|attr| (attr.name(), attr.value()))
                            .collect(),
                    });
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        )
        .map_err(|e| MarkupError::Rewrite(e.to_string()))?;

        Ok(found)
    }

    /// All elements with a given tag name.
    pub fn find_all_by_tag(&self, tag: &str) -> Result<Vec<ElementInfo>> {
        self.find_all(tag)
    }

    /// First element with a tag and an exact attribute value.
    pub fn find_by_attribute(
        &self,
        tag: &str,
        name: &str,
        value: &str,
    ) -> Result<Option<ElementInfo>> {
        Ok(self
            .find_all(&attr_selector(tag, name, value))?
            .into_iter()
            .next())
    }

    /// Whether any element matches a selector.
    pub fn exists(&self, selector: &str) -> Result<bool> {
        Ok(!self.find_all(selector)?.is_empty())
    }

    /// Run `edit` on every element matching `selector`.
    ///
    /// The callback returns whether it modified the element; the number of
    /// modified elements is returned.
    pub fn edit<F>(&mut self, selector: &str, edit: F) -> Result<usize>
    where
        F: FnMut(&mut Element<'_, '_>) -> std::result::Result<bool, HandlerError>,
    {
        self.edit_limited(selector, usize::MAX, edit)
    }

    /// Run `edit` on the first element matching `selector` only.
    pub fn edit_first<F>(&mut self, selector: &str, edit: F) -> Result<bool>
    where
        F: FnMut(&mut Element<'_, '_>) -> std::result::Result<bool, HandlerError>,
    {
        Ok(self.edit_limited(selector, 1, edit)? > 0)
    }

    fn edit_limited<F>(&mut self, selector: &str, limit: usize, mut edit: F) -> Result<usize>
    where
        F: FnMut(&mut Element<'_, '_>) -> std::result::Result<bool, HandlerError>,
    {
        parse_selector(selector)?;

        let mut seen = 0usize;
        let mut edited = 0usize;
        let output = rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![element!(selector, |el| {
                    if seen >= limit {
                        return Ok(());
                    }
                    seen += 1;
                    if edit(el)? {
                        edited += 1;
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        )
        .map_err(|e| MarkupError::Rewrite(e.to_string()))?;

        // Edits lol_html drops (appends to an element without an end tag)
        // leave the text as it was and do not count.
        if edited == 0 || output == self.html {
            return Ok(0);
        }
        self.html = output;
        Ok(edited)
    }

    /// Whether the text closes `tag` explicitly (`</body>` may be implied).
    pub fn has_end_tag(&self, tag: &str) -> bool {
        self.html
            .to_ascii_lowercase()
            .contains(&format!("</{}", tag.to_ascii_lowercase()))
    }

    /// Insert `fragment` before a closing `</html>`, or at the very end when
    /// there is none.
    pub fn append_to_document(&mut self, fragment: &str) {
        let at = self
            .html
            .to_ascii_lowercase()
            .rfind("</html")
            .unwrap_or(self.html.len());
        self.html.insert_str(at, fragment);
    }

    /// Replace the first match of `pattern` with literal `replacement`.
    ///
    /// Returns how many candidate matches the document had.
    pub fn replace_first(&mut self, pattern: &Regex, replacement: &str) -> usize {
        let candidates = pattern.find_iter(&self.html).count();
        if candidates > 0 {
            self.html = pattern
                .replacen(&self.html, 1, NoExpand(replacement))
                .into_owned();
        }
        candidates
    }
}

fn parse_selector(selector: &str) -> Result<()> {
    selector
        .parse::<Selector>()
        .map(|_| ())
        .map_err(|e| MarkupError::Selector {
            selector: selector.to_string(),
            message: e.to_string(),
        })
}

/// Selector for `tag[name="value"]` with the value quoted.
pub fn attr_selector(tag: &str, name: &str, value: &str) -> String {
    let value = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"{tag}[{name}="{value}"]"#)
}

/// Escape text for use inside a double-quoted HTML attribute.
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
