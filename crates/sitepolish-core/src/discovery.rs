//! Page discovery.
//!
//! Walks the site root once and returns the markup pages and source
//! stylesheets every later pass works on.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{
    config::Config,
    error::{CoreError, Result},
    page::PageDescriptor,
};

/// Suffix identifying stylesheets that are already minified.
pub const MINIFIED_CSS_SUFFIX: &str = ".min.css";

/// Snapshot of the in-scope files of a site.
#[derive(Debug, Clone, Default)]
pub struct SiteTree {
    /// Site root the paths are relative to.
    pub root: PathBuf,

    /// Markup pages, sorted by path.
    pub pages: Vec<PageDescriptor>,

    /// Source stylesheets (absolute paths), sorted, `.min.css` excluded.
    pub stylesheets: Vec<PathBuf>,
}

impl SiteTree {
    /// Absolute path of a page.
    pub fn page_path(&self, page: &PageDescriptor) -> PathBuf {
        self.root.join(&page.path)
    }
}

/// Walks a site root and classifies files.
#[derive(Debug)]
pub struct SiteScanner<'a> {
    config: &'a Config,
    root: PathBuf,
}

impl<'a> SiteScanner<'a> {
    /// Create a scanner for a site root.
    #[must_use]
    pub fn new(config: &'a Config, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            root: root.into(),
        }
    }

    /// Scan the tree.
    ///
    /// Only an unusable root is an error; unreadable entries below it are
    /// logged and skipped.
    pub fn scan(&self) -> Result<SiteTree> {
        if !self.root.is_dir() {
            return Err(CoreError::RootNotFound(self.root.clone()));
        }
        // Surface permission problems on the root itself.
        fs::read_dir(&self.root)?;

        info!(root = %self.root.display(), "scanning site");

        let mut tree = SiteTree {
            root: self.root.clone(),
            ..SiteTree::default()
        };

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    let path = e.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                    return Err(CoreError::walk(path, e.to_string()));
                }
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            self.classify(entry.path(), &mut tree);
        }

        tree.pages.sort_by(|a, b| a.path.cmp(&b.path));
        tree.stylesheets.sort();

        info!(
            pages = tree.pages.len(),
            stylesheets = tree.stylesheets.len(),
            "scan complete"
        );

        Ok(tree)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.config.is_ignored_dir(name))
    }

    fn classify(&self, path: &Path, tree: &mut SiteTree) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %path.display(), "skipping non UTF-8 file name");
            return;
        };
        let lower = name.to_ascii_lowercase();

        if lower.ends_with(".html") {
            let Ok(relative) = path.strip_prefix(&self.root) else {
                return;
            };
            match PageDescriptor::from_relative(relative, self.config) {
                Some(page) => tree.pages.push(page),
                None => debug!(path = %path.display(), "skipping page with unusable path"),
            }
        } else if lower.ends_with(".css") && !lower.ends_with(MINIFIED_CSS_SUFFIX) {
            tree.stylesheets.push(path.to_path_buf());
        }
    }
}
