//! Page descriptors.

use std::path::{Component, Path};

use crate::config::Config;

/// Metadata about one markup file, used for site-wide artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    /// Root-relative path with `/` separators (e.g., "gallery/x.html").
    pub path: String,

    /// Number of path components below the site root (`index.html` is 1).
    pub depth: usize,

    /// Language tag inferred from the file name.
    pub locale: String,

    /// Whether a naming rule excludes this page from the sitemap.
    pub is_excluded: bool,
}

impl PageDescriptor {
    /// Describe a page from its path relative to the site root.
    ///
    /// Returns `None` for paths that are not plain relative file paths.
    pub fn from_relative(relative: &Path, config: &Config) -> Option<Self> {
        let mut components = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => components.push(name.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }

        let (file_name, dirs) = components.split_last()?;

        let is_excluded = config
            .sitemap
            .exclude_prefixes
            .iter()
            .any(|prefix| file_name.starts_with(prefix.as_str()))
            || dirs
                .iter()
                .any(|dir| config.sitemap.exclude_dirs.iter().any(|d| d == *dir));

        Some(Self {
            path: components.join("/"),
            depth: components.len(),
            locale: config.locale_for(file_name),
            is_excluded,
        })
    }

    /// Whether this page is the site's root index page.
    pub fn is_index(&self) -> bool {
        self.path == "index.html"
    }

    /// Whether this page belongs in the sitemap.
    pub fn in_sitemap(&self, max_depth: usize) -> bool {
        self.depth <= max_depth && !self.is_excluded
    }
}
