//! robots.txt generation.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use sitepolish_core::Config;
use tracing::info;

use crate::sitemap::{Result, SitemapError};

/// The crawl policy written to robots.txt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlPolicy {
    pub user_agent: String,
    pub allow_rules: Vec<String>,
    pub disallow_rules: Vec<String>,
    pub sitemap_url: String,
}

impl CrawlPolicy {
    /// Policy for every user agent, pointing at the site's sitemap.
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_agent: "*".to_string(),
            allow_rules: config.robots.allow.clone(),
            disallow_rules: config.robots.disallow.clone(),
            sitemap_url: config.sitemap_url(),
        }
    }

    /// Render robots.txt.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "User-agent: {}", self.user_agent);
        for path in &self.allow_rules {
            let _ = writeln!(text, "Allow: {path}");
        }
        for path in &self.disallow_rules {
            let _ = writeln!(text, "Disallow: {path}");
        }
        text.push('\n');
        let _ = writeln!(text, "Sitemap: {}", self.sitemap_url);
        text
    }

    /// Write `robots.txt` under `root`, replacing any previous file.
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        let path = root.join("robots.txt");
        fs::write(&path, self.to_text()).map_err(|source| SitemapError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "wrote robots.txt");
        Ok(path)
    }
}
