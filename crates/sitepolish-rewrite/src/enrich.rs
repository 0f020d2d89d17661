//! Image attribute enrichment.
//!
//! Adds intrinsic dimensions, deferred loading, an `object-fit` declaration
//! and fallback alt text to local `<img>` elements. Values already present in
//! the markup are never overwritten.

use std::path::{Path, PathBuf};

use sitepolish_core::config::ImageConfig;
use thiserror::Error;
use tracing::{debug, trace};

use crate::markup::{MarkupDocument, MarkupError};

/// Enrichment errors.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Markup error.
    #[error("markup error: {0}")]
    Markup(#[from] MarkupError),
}

/// Result type for enrichment.
pub type Result<T> = std::result::Result<T, EnrichError>;

/// Pixel dimensions of an image asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Reads pixel dimensions from an image file.
pub trait DimensionProbe: Send + Sync {
    /// Dimensions of the image at `path`, or `None` when it cannot be read.
    fn probe(&self, path: &Path) -> Option<ImageDimensions>;
}

/// Probe backed by the `image` crate; only headers are decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateProbe;

impl DimensionProbe for ImageCrateProbe {
    fn probe(&self, path: &Path) -> Option<ImageDimensions> {
        match image::image_dimensions(path) {
            Ok((width, height)) => Some(ImageDimensions { width, height }),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "image probe miss");
                None
            }
        }
    }
}

/// Whether an image source points off-site.
pub fn is_remote(src: &str) -> bool {
    let lower = src.trim().to_ascii_lowercase();
    ["http:", "https:", "//", "data:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Filesystem path of a local image source.
///
/// Root-relative sources resolve against the site root, others against the
/// page's directory. Query strings and fragments are dropped.
pub fn resolve_source(src: &str, page_dir: &Path, root: &Path) -> Option<PathBuf> {
    let path = src.split(['?', '#']).next().unwrap_or_default().trim();
    if path.is_empty() {
        return None;
    }
    match path.strip_prefix('/') {
        Some(rooted) => Some(root.join(rooted)),
        None => Some(page_dir.join(path)),
    }
}

fn declares(style: &str, property: &str) -> bool {
    style.split(';').any(|declaration| {
        declaration
            .split_once(':')
            .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case(property))
    })
}

fn append_declaration(style: &str, declaration: &str) -> String {
    let style = style.trim();
    if style.is_empty() {
        declaration.to_string()
    } else if style.ends_with(';') {
        format!("{style} {declaration}")
    } else {
        format!("{style}; {declaration}")
    }
}

fn contains_any(haystack: &str, tokens: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    tokens
        .iter()
        .filter(|t| !t.is_empty())
        .any(|t| haystack.contains(&t.to_lowercase()))
}

/// Enriches `<img>` elements of one document.
pub struct ImageEnricher {
    config: ImageConfig,
    probe: Box<dyn DimensionProbe>,
}

impl std::fmt::Debug for ImageEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageEnricher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ImageEnricher {
    /// Create an enricher using the given probe.
    pub fn new(config: ImageConfig, probe: Box<dyn DimensionProbe>) -> Self {
        Self { config, probe }
    }

    /// Create an enricher backed by [`ImageCrateProbe`].
    pub fn with_image_probe(config: ImageConfig) -> Self {
        Self::new(config, Box::new(ImageCrateProbe))
    }

    /// Enrich every local image of `doc`, returning whether anything changed.
    ///
    /// `page_dir` is the directory holding the page, `root` the site root.
    pub fn enrich(&self, doc: &mut MarkupDocument, page_dir: &Path, root: &Path) -> Result<bool> {
        let object_fit = format!("object-fit: {};", self.config.object_fit);

        let edited = doc.edit("img[src]", |el| {
            let Some(src) = el.get_attribute("src") else {
                return Ok(false);
            };
            if is_remote(&src) {
                trace!(src = %src, "skipping remote image");
                return Ok(false);
            }

            let mut changed = false;

            if !el.has_attribute("width") && !el.has_attribute("height") {
                let dimensions = resolve_source(&src, page_dir, root)
                    .and_then(|path| self.probe.probe(&path));
                if let Some(ImageDimensions { width, height }) = dimensions {
                    el.set_attribute("width", &width.to_string())?;
                    el.set_attribute("height", &height.to_string())?;
                    changed = true;
                }
            }

            if !el.has_attribute("loading") && !contains_any(&src, &self.config.exempt_tokens) {
                el.set_attribute("loading", &self.config.loading)?;
                changed = true;
            }

            let style = el.get_attribute("style").unwrap_or_default();
            if !declares(&style, "object-fit") {
                el.set_attribute("style", &append_declaration(&style, &object_fit))?;
                changed = true;
            }

            if !el.has_attribute("alt") {
                let alt = if contains_any(&src, &self.config.brand_tokens) {
                    &self.config.brand_alt
                } else {
                    &self.config.fallback_alt
                };
                el.set_attribute("alt", alt)?;
                changed = true;
            }

            Ok(changed)
        })?;

        if edited > 0 {
            debug!(images = edited, "enriched images");
        }
        Ok(edited > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs};

    use tempfile::TempDir;

    use super::*;

    /// Probe answering from a fixed table.
    struct FakeProbe(HashMap<PathBuf, ImageDimensions>);

    impl DimensionProbe for FakeProbe {
        fn probe(&self, path: &Path) -> Option<ImageDimensions> {
            self.0.get(path).copied()
        }
    }

    fn enricher(entries: &[(&str, u32, u32)]) -> ImageEnricher {
        let table = entries
            .iter()
            .map(|(path, width, height)| {
                (
                    PathBuf::from(path),
                    ImageDimensions {
                        width: *width,
                        height: *height,
                    },
                )
            })
            .collect();
        ImageEnricher::new(ImageConfig::default(), Box::new(FakeProbe(table)))
    }

    fn run(enricher: &ImageEnricher, html: &str) -> (String, bool) {
        let mut doc = MarkupDocument::parse(html).unwrap();
        let changed = enricher
            .enrich(&mut doc, Path::new("/site"), Path::new("/site"))
            .unwrap();
        (doc.into_string(), changed)
    }

    #[test]
    fn test_logo_example() {
        let (html, changed) = run(&enricher(&[]), r#"<img src="logo.png">"#);

        assert!(changed);
        assert_eq!(
            html,
            r#"<img src="logo.png" style="object-fit: cover;" alt="Site logo">"#
        );
    }

    #[test]
    fn test_photo_gets_everything() {
        let enricher = enricher(&[("/site/images/a.jpg", 800, 600)]);
        let (html, _) = run(&enricher, r#"<img src="images/a.jpg">"#);

        assert_eq!(
            html,
            r#"<img src="images/a.jpg" width="800" height="600" loading="lazy" style="object-fit: cover;" alt="Photograph">"#
        );
    }

    #[test]
    fn test_never_overwrites_existing_values() {
        let enricher = enricher(&[("/site/a.jpg", 800, 600)]);
        let input = r#"<img src="a.jpg" width="10" alt="Mine" loading="eager" style="object-fit: contain">"#;
        let (html, changed) = run(&enricher, input);

        assert!(!changed);
        assert_eq!(html, input);
    }

    #[test]
    fn test_existing_style_is_extended() {
        let (html, _) = run(&enricher(&[]), r#"<img src="hero.jpg" alt="" style="border: 0">"#);
        assert!(html.contains(r#"style="border: 0; object-fit: cover;""#));
        assert!(!html.contains("loading="));

        let (html, _) = run(&enricher(&[]), r#"<img src="hero.jpg" alt="" style="border: 0;">"#);
        assert!(html.contains(r#"style="border: 0; object-fit: cover;""#));
    }

    #[test]
    fn test_exempt_tokens_are_case_insensitive() {
        let (html, _) = run(&enricher(&[]), r#"<img src="images/HERO-bg.jpg" alt="x">"#);
        assert!(!html.contains("loading="));
    }

    #[test]
    fn test_remote_images_untouched() {
        let input = r#"<img src="https://cdn.example.com/a.jpg"><img src="//cdn.example.com/b.jpg"><img src="data:image/png;base64,AAAA">"#;
        let (html, changed) = run(&enricher(&[]), input);

        assert!(!changed);
        assert_eq!(html, input);
    }

    #[test]
    fn test_probe_miss_omits_dimensions() {
        let (html, changed) = run(&enricher(&[]), r#"<img src="missing.jpg">"#);
        assert!(changed);
        assert!(!html.contains("width="));
        assert!(!html.contains("height="));
    }

    #[test]
    fn test_second_pass_is_noop() {
        let enricher = enricher(&[("/site/a.jpg", 4, 3)]);
        let (first, _) = run(&enricher, r#"<p><img src="a.jpg"><img src="logo.svg"></p>"#);
        let (second, changed) = run(&enricher, &first);

        assert!(!changed);
        assert_eq!(second, first);
    }

    #[test]
    fn test_resolve_source() {
        let page_dir = Path::new("/site/gallery");
        let root = Path::new("/site");

        assert_eq!(
            resolve_source("img/a.jpg?v=2#top", page_dir, root),
            Some(PathBuf::from("/site/gallery/img/a.jpg"))
        );
        assert_eq!(
            resolve_source("/images/a.jpg", page_dir, root),
            Some(PathBuf::from("/site/images/a.jpg"))
        );
        assert_eq!(resolve_source("?v=1", page_dir, root), None);
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("HTTPS://example.com/a.png"));
        assert!(is_remote("//example.com/a.png"));
        assert!(!is_remote("images/a.png"));
        assert!(!is_remote("/images/a.png"));
    }

    #[test]
    fn test_image_crate_probe_reads_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pixel.png");
        image::RgbImage::new(3, 2).save(&path).unwrap();

        assert_eq!(
            ImageCrateProbe.probe(&path),
            Some(ImageDimensions {
                width: 3,
                height: 2
            })
        );

        let broken = dir.path().join("broken.png");
        fs::write(&broken, b"not an image").unwrap();
        assert_eq!(ImageCrateProbe.probe(&broken), None);
        assert_eq!(ImageCrateProbe.probe(&dir.path().join("absent.png")), None);
    }
}
