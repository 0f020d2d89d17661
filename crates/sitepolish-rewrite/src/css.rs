//! Stylesheet minification.
//!
//! A lexical pass, not a CSS parser: comments go, whitespace collapses, and
//! whitespace around structural punctuation is dropped. A `/*` inside a
//! string literal will confuse it.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use sitepolish_core::discovery::MINIFIED_CSS_SUFFIX;
use thiserror::Error;
use tracing::debug;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid comment regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{}:;,>+~])\s*").expect("valid punctuation regex"));

/// Minification errors.
#[derive(Debug, Error)]
pub enum MinifyError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source path has no usable file name.
    #[error("invalid stylesheet path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for minification.
pub type Result<T> = std::result::Result<T, MinifyError>;

/// A source stylesheet read from disk.
#[derive(Debug, Clone)]
pub struct StylesheetAsset {
    /// Path of the source stylesheet.
    pub source_path: PathBuf,

    /// Unmodified source text.
    pub raw_text: String,
}

/// The minified form of a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifiedStylesheet {
    /// Sibling path the minified text belongs at.
    pub derived_path: PathBuf,

    /// Minified text.
    pub minified_text: String,
}

/// Outcome of minifying one file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifyOutcome {
    /// Where the minified text was (or would be) written.
    pub derived_path: PathBuf,

    /// Whether the derived file was created or its content changed.
    pub changed: bool,
}

impl StylesheetAsset {
    /// Read a stylesheet from disk.
    pub fn read(path: &Path) -> Result<Self> {
        Ok(Self {
            source_path: path.to_path_buf(),
            raw_text: fs::read_to_string(path)?,
        })
    }

    /// Minify into the derived sibling form.
    pub fn minify(&self) -> Result<MinifiedStylesheet> {
        Ok(MinifiedStylesheet {
            derived_path: derived_path(&self.source_path)?,
            minified_text: minify(&self.raw_text),
        })
    }
}

/// Minify stylesheet text.
pub fn minify(css: &str) -> String {
    let css = COMMENT.replace_all(css, "");
    let css = WHITESPACE.replace_all(&css, " ");
    let css = PUNCTUATION.replace_all(&css, "$1");
    css.trim().to_string()
}

/// Sibling path of the minified variant (`name.css` → `name.min.css`).
pub fn derived_path(source: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MinifyError::InvalidPath(source.to_path_buf()))?;
    Ok(source.with_file_name(format!("{stem}{MINIFIED_CSS_SUFFIX}")))
}

/// Minify a stylesheet file into its derived sibling.
///
/// The source is never written. An existing derived file whose content
/// already matches is left alone.
pub fn minify_file(source: &Path, dry_run: bool) -> Result<MinifyOutcome> {
    let minified = StylesheetAsset::read(source)?.minify()?;

    let current = fs::read_to_string(&minified.derived_path).ok();
    let changed = current.as_deref() != Some(minified.minified_text.as_str());

    if changed && !dry_run {
        fs::write(&minified.derived_path, &minified.minified_text)?;
        debug!(
            src = %source.display(),
            dest = %minified.derived_path.display(),
            "wrote minified stylesheet"
        );
    }

    Ok(MinifyOutcome {
        derived_path: minified.derived_path,
        changed,
    })
}
