//! Sitemap generation.
//!
//! Derives `sitemap.xml` and the matching crawl policy from the discovered
//! page set. Output is deterministic apart from the `lastmod` date.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use sitepolish_core::{ChangeFreq, Config, PageDescriptor};
use thiserror::Error;
use tracing::{debug, info};

use crate::robots::CrawlPolicy;

/// Sitemap generation errors.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// IO error.
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for sitemap operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

/// A sitemap URL entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// Absolute URL.
    pub loc: String,

    /// Last modification date.
    pub lastmod: NaiveDate,

    /// Change frequency.
    pub changefreq: ChangeFreq,

    /// Priority (0.0 to 1.0).
    pub priority: f32,
}

/// The sitemap of one site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteDescriptor {
    /// Base URL without trailing slash.
    pub base_url: String,

    /// Entries sorted by page path.
    pub entries: Vec<SitemapEntry>,
}

/// Build the sitemap and crawl policy for `pages`, dated `today`.
pub fn emit(
    pages: &[PageDescriptor],
    config: &Config,
    today: NaiveDate,
) -> (SiteDescriptor, CrawlPolicy) {
    let base_url = config.site.base_url.trim_end_matches('/').to_string();

    let mut listed: Vec<&PageDescriptor> = pages
        .iter()
        .filter(|page| page.in_sitemap(config.sitemap.max_depth))
        .collect();
    listed.sort_by(|a, b| a.path.cmp(&b.path));

    let entries = listed
        .into_iter()
        .map(|page| SitemapEntry {
            loc: if page.is_index() {
                format!("{base_url}/")
            } else {
                config.url_for(&page.path)
            },
            lastmod: today,
            changefreq: config.sitemap.changefreq,
            priority: config.priority_for(&page.path),
        })
        .collect::<Vec<_>>();

    debug!(
        pages = pages.len(),
        entries = entries.len(),
        "built sitemap entries"
    );

    let policy = CrawlPolicy::from_config(config);
    (SiteDescriptor { base_url, entries }, policy)
}

impl SiteDescriptor {
    /// Render the sitemap XML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');

        for entry in &self.entries {
            xml.push_str(&entry_to_xml(entry));
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// Write `sitemap.xml` under `root`, replacing any previous file.
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        let path = root.join("sitemap.xml");
        fs::write(&path, self.to_xml()).map_err(|source| SitemapError::Io {
            path: path.clone(),
            source,
        })?;
        info!(entries = self.entries.len(), path = %path.display(), "wrote sitemap");
        Ok(path)
    }
}

fn entry_to_xml(entry: &SitemapEntry) -> String {
    let mut xml = String::from("  <url>\n");
    xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
    xml.push_str(&format!(
        "    <lastmod>{}</lastmod>\n",
        entry.lastmod.format("%Y-%m-%d")
    ));
    xml.push_str(&format!(
        "    <changefreq>{}</changefreq>\n",
        entry.changefreq.as_str()
    ));
    xml.push_str(&format!(
        "    <priority>{}</priority>\n",
        format_priority(entry.priority)
    ));
    xml.push_str("  </url>\n");
    xml
}

/// Shortest exact form of a priority, with at least one decimal.
fn format_priority(priority: f32) -> String {
    let text = priority.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
