//! SEO normalization: document language, viewport and description meta.

use lol_html::html_content::ContentType;
use sitepolish_core::config::SeoConfig;
use tracing::debug;

use crate::markup::{MarkupDocument, Result, attr_selector, escape_attr};

/// Adds missing document-level metadata.
#[derive(Debug, Clone)]
pub struct SeoNormalizer {
    viewport: String,
    description: String,
}

impl SeoNormalizer {
    /// Create a normalizer from configuration.
    pub fn new(config: &SeoConfig) -> Self {
        Self {
            viewport: config.viewport.clone(),
            description: config.description.clone(),
        }
    }

    /// Normalize `doc` for a page in `locale`, returning whether it changed.
    pub fn normalize(&self, doc: &mut MarkupDocument, locale: &str) -> Result<bool> {
        let mut changed = self.set_language(doc, locale)?;
        changed |= self.ensure_meta(doc, "viewport", &self.viewport)?;
        changed |= self.ensure_meta(doc, "description", &self.description)?;
        Ok(changed)
    }

    fn set_language(&self, doc: &mut MarkupDocument, locale: &str) -> Result<bool> {
        doc.edit_first("html", |el| {
            let has_lang = el
                .get_attribute("lang")
                .is_some_and(|lang| !lang.trim().is_empty());
            if has_lang {
                return Ok(false);
            }
            el.set_attribute("lang", locale)?;
            Ok(true)
        })
    }

    fn ensure_meta(&self, doc: &mut MarkupDocument, name: &str, content: &str) -> Result<bool> {
        if doc.exists(&attr_selector("meta", "name", name))? {
            return Ok(false);
        }

        let meta = format!(
            "<meta name=\"{name}\" content=\"{}\">\n",
            escape_attr(content)
        );
        let added = if doc.has_end_tag("head") {
            doc.edit_first("head", |el| {
                el.append(&meta, ContentType::Html);
                Ok(true)
            })?
        } else if !doc.exists("head")? {
            false
        } else if doc.exists("body")? {
            // Implied `</head>`: the head ends where the body starts.
            doc.edit_first("body", |el| {
                el.before(&meta, ContentType::Html);
                Ok(true)
            })?
        } else {
            doc.edit_first("head", |el| {
                el.prepend(&meta, ContentType::Html);
                Ok(true)
            })?
        };
        if added {
            debug!(meta = name, "added meta tag");
        }
        Ok(added)
    }
}
