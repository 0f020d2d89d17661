//! Pipeline configuration management.
//!
//! Every site-specific literal the passes need (locale suffixes, priority
//! table, alt texts, injected fragments) lives here so the passes can be
//! exercised against synthetic configurations.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Directories that are never walked, regardless of configuration.
pub const ALWAYS_IGNORED_DIRS: &[&str] = &[".git", "node_modules"];

/// Main configuration structure for sitepolish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// File-tree walk settings.
    #[serde(default)]
    pub walk: WalkConfig,

    /// Stylesheet minification settings.
    #[serde(default)]
    pub css: CssConfig,

    /// Image enrichment settings.
    #[serde(default)]
    pub images: ImageConfig,

    /// SEO normalization settings.
    #[serde(default)]
    pub seo: SeoConfig,

    /// Sitemap settings.
    #[serde(default)]
    pub sitemap: SitemapConfig,

    /// robots.txt settings.
    #[serde(default)]
    pub robots: RobotsConfig,

    /// Gallery page rewrite rules.
    #[serde(default)]
    pub gallery: GalleryConfig,

    /// Execution settings.
    #[serde(default)]
    pub build: BuildConfig,
}

/// Site-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL for the site (e.g., "https://example.com").
    #[serde(default)]
    pub base_url: String,

    /// Language tag used when no locale marker is found.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Filename stem suffix to language tag (e.g., `fr = "fr"` maps
    /// `aboutfr.html` to `fr`). An empty table disables inference.
    #[serde(default = "default_locales")]
    pub locales: BTreeMap<String, String>,
}

/// File-tree walk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Extra directory names to skip, on top of [`ALWAYS_IGNORED_DIRS`].
    #[serde(default)]
    pub ignore_dirs: Vec<String>,
}

/// Stylesheet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CssConfig {
    /// Whether to produce `.min.css` siblings.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to point `<link rel="stylesheet">` at existing `.min.css` siblings.
    #[serde(default = "default_true")]
    pub rewrite_references: bool,
}

/// Image enrichment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Whether the enrichment pass runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Source substrings that exempt an image from deferred loading.
    #[serde(default = "default_exempt_tokens")]
    pub exempt_tokens: Vec<String>,

    /// Source substrings that mark a brand image.
    #[serde(default = "default_brand_tokens")]
    pub brand_tokens: Vec<String>,

    /// Alt text for brand images.
    #[serde(default = "default_brand_alt")]
    pub brand_alt: String,

    /// Alt text for every other image.
    #[serde(default = "default_fallback_alt")]
    pub fallback_alt: String,

    /// Value of the injected `loading` attribute.
    #[serde(default = "default_loading")]
    pub loading: String,

    /// Value of the injected `object-fit` declaration.
    #[serde(default = "default_object_fit")]
    pub object_fit: String,
}

/// SEO normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoConfig {
    /// Whether the SEO pass runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Content of the injected viewport meta.
    #[serde(default = "default_viewport")]
    pub viewport: String,

    /// Fallback content of the injected description meta.
    #[serde(default = "default_description")]
    pub description: String,
}

/// Change frequency for sitemap entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    /// Value as written in sitemap XML.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

/// Sitemap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    /// Whether sitemap.xml is written.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Deepest page (in path components) listed in the sitemap.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Change frequency written for every entry.
    #[serde(default)]
    pub changefreq: ChangeFreq,

    /// Priority for pages missing from `priorities`.
    #[serde(default = "default_priority")]
    pub default_priority: f32,

    /// Exact root-relative path to priority.
    #[serde(default = "default_priorities")]
    pub priorities: BTreeMap<String, f32>,

    /// File name prefixes excluded from the sitemap.
    #[serde(default = "default_exclude_prefixes")]
    pub exclude_prefixes: Vec<String>,

    /// Directory names whose pages are excluded from the sitemap.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

/// robots.txt configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotsConfig {
    /// Whether robots.txt is written.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `Allow:` paths.
    #[serde(default = "default_allow")]
    pub allow: Vec<String>,

    /// `Disallow:` paths.
    #[serde(default = "default_disallow")]
    pub disallow: Vec<String>,
}

/// A page that receives the gallery rewrite rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryPage {
    /// Root-relative path of the page (e.g., "portrait.html").
    pub file: String,

    /// Display category (e.g., "Portrait").
    pub category: String,

    /// Alt text replacing the placeholder on this page's images.
    #[serde(default)]
    pub alt: Option<String>,
}

/// Gallery rewrite configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Stylesheet after which the gallery stylesheet is linked.
    #[serde(default = "default_anchor_stylesheet")]
    pub anchor_stylesheet: String,

    /// Gallery stylesheet href.
    #[serde(default = "default_gallery_stylesheet")]
    pub stylesheet: String,

    /// Script after which the gallery script is referenced.
    #[serde(default = "default_anchor_script")]
    pub anchor_script: String,

    /// Gallery script src.
    #[serde(default = "default_gallery_script")]
    pub script: String,

    /// Regex locating the heading block to replace (first match wins).
    #[serde(default = "default_block_pattern")]
    pub block_pattern: String,

    /// Replacement block; `{category}` is substituted.
    #[serde(default = "default_block_template")]
    pub block_template: String,

    /// Substring proving the block was already replaced.
    #[serde(default = "default_block_marker")]
    pub block_marker: String,

    /// Tag of the container to identify.
    #[serde(default = "default_container_tag")]
    pub container_tag: String,

    /// Exact class of the container to identify.
    #[serde(default = "default_container_class")]
    pub container_class: String,

    /// Class appended to the identified container.
    #[serde(default = "default_container_extra_class")]
    pub container_extra_class: String,

    /// Id given to the identified container.
    #[serde(default = "default_container_id")]
    pub container_id: String,

    /// Fragment inserted before `</body>`.
    #[serde(default = "default_fragment")]
    pub fragment: String,

    /// Substring proving the fragment is already present.
    #[serde(default = "default_fragment_marker")]
    pub fragment_marker: String,

    /// Tag whose inline styles are stripped.
    #[serde(default = "default_strip_style_tag")]
    pub strip_style_tag: String,

    /// Style properties kept when stripping.
    #[serde(default = "default_preserve_styles")]
    pub preserve_styles: Vec<String>,

    /// Placeholder alt value to replace.
    #[serde(default = "default_alt_placeholder")]
    pub alt_placeholder: String,

    /// Pages receiving the gallery rules.
    #[serde(default)]
    pub pages: Vec<GalleryPage>,
}

/// Execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Worker threads for per-file passes.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Compute changes without writing files.
    #[serde(default)]
    pub dry_run: bool,
}

// Default value functions
fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

fn default_exempt_tokens() -> Vec<String> {
    vec!["hero".to_string(), "logo".to_string()]
}

fn default_brand_tokens() -> Vec<String> {
    vec!["logo".to_string()]
}

fn default_brand_alt() -> String {
    "Site logo".to_string()
}

fn default_fallback_alt() -> String {
    "Photograph".to_string()
}

fn default_loading() -> String {
    "lazy".to_string()
}

fn default_object_fit() -> String {
    "cover".to_string()
}

fn default_viewport() -> String {
    "width=device-width, initial-scale=1.0".to_string()
}

fn default_description() -> String {
    "Official website.".to_string()
}

fn default_max_depth() -> usize {
    1
}

fn default_priority() -> f32 {
    0.5
}

fn default_priorities() -> BTreeMap<String, f32> {
    BTreeMap::from([("index.html".to_string(), 1.0)])
}

fn default_exclude_prefixes() -> Vec<String> {
    vec!["demo".to_string()]
}

fn default_exclude_dirs() -> Vec<String> {
    vec!["fonts".to_string()]
}

fn default_allow() -> Vec<String> {
    ["/", "/css/", "/js/", "/images/", "/fonts/"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_disallow() -> Vec<String> {
    ["/admin/", "/.git/", "/.vscode/", "/scss/"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_anchor_stylesheet() -> String {
    "css/animations.css".to_string()
}

fn default_gallery_stylesheet() -> String {
    "css/gallery-improvements.css".to_string()
}

fn default_anchor_script() -> String {
    "js/performance.js".to_string()
}

fn default_gallery_script() -> String {
    "js/gallery-enhancements.js".to_string()
}

fn default_block_pattern() -> String {
    r#"(?s)<div class="col-md-7">.*?<h2 class="site-section-heading[^"]*">.*?</h2>.*?</div>.*?</div>.*?</div>"#
        .to_string()
}

fn default_block_template() -> String {
    r#"<div class="col-md-7">
<div class="row mb-5">
<div class="col-12">
<h2 class="site-section-heading text-center">{category} Gallery</h2>
<div class="text-center mt-4 mb-4">
<a class="book-now-btn" href="contact.html">Book Your {category} Session</a>
</div>
</div>
</div>
</div>"#
        .to_string()
}

fn default_block_marker() -> String {
    "book-now-btn".to_string()
}

fn default_container_tag() -> String {
    "div".to_string()
}

fn default_container_class() -> String {
    "row".to_string()
}

fn default_container_extra_class() -> String {
    "gallery-grid".to_string()
}

fn default_container_id() -> String {
    "lightgallery".to_string()
}

fn default_fragment() -> String {
    "\n<!-- Floating Book Now Button -->\n<a href=\"contact.html\" class=\"floating-book-btn\">\nBook Now\n</a>\n"
        .to_string()
}

fn default_fragment_marker() -> String {
    "floating-book-btn".to_string()
}

fn default_strip_style_tag() -> String {
    "img".to_string()
}

fn default_preserve_styles() -> Vec<String> {
    vec!["object-fit".to_string()]
}

fn default_alt_placeholder() -> String {
    "Image".to_string()
}

fn default_locales() -> BTreeMap<String, String> {
    BTreeMap::from([("fr".to_string(), "fr".to_string())])
}

fn default_workers() -> usize {
    4
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_language: default_language(),
            locales: default_locales(),
        }
    }
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rewrite_references: true,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exempt_tokens: default_exempt_tokens(),
            brand_tokens: default_brand_tokens(),
            brand_alt: default_brand_alt(),
            fallback_alt: default_fallback_alt(),
            loading: default_loading(),
            object_fit: default_object_fit(),
        }
    }
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            viewport: default_viewport(),
            description: default_description(),
        }
    }
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: default_max_depth(),
            changefreq: ChangeFreq::default(),
            default_priority: default_priority(),
            priorities: default_priorities(),
            exclude_prefixes: default_exclude_prefixes(),
            exclude_dirs: default_exclude_dirs(),
        }
    }
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow: default_allow(),
            disallow: default_disallow(),
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            anchor_stylesheet: default_anchor_stylesheet(),
            stylesheet: default_gallery_stylesheet(),
            anchor_script: default_anchor_script(),
            script: default_gallery_script(),
            block_pattern: default_block_pattern(),
            block_template: default_block_template(),
            block_marker: default_block_marker(),
            container_tag: default_container_tag(),
            container_class: default_container_class(),
            container_extra_class: default_container_extra_class(),
            container_id: default_container_id(),
            fragment: default_fragment(),
            fragment_marker: default_fragment_marker(),
            strip_style_tag: default_strip_style_tag(),
            preserve_styles: default_preserve_styles(),
            alt_placeholder: default_alt_placeholder(),
            pages: Vec::new(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            dry_run: false,
        }
    }
}

impl GalleryConfig {
    /// Find the gallery entry for a root-relative page path.
    pub fn page(&self, path: &str) -> Option<&GalleryPage> {
        self.pages.iter().find(|p| p.file == path)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration using the config crate, with `SITEPOLISH__`
    /// environment overrides (e.g. `SITEPOLISH__SITE__BASE_URL`).
    ///
    /// A missing file yields the defaults. The result is not validated so
    /// callers can apply command-line overrides first.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("SITEPOLISH").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let base_url = &self.site.base_url;
        if base_url.is_empty() {
            return Err(CoreError::config("site.base_url cannot be empty"));
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(CoreError::config(format!(
                "site.base_url must be an absolute http(s) URL, got {base_url}"
            )));
        }

        if base_url.ends_with('/') {
            tracing::warn!("site.base_url should not have a trailing slash");
        }

        if self.site.default_language.trim().is_empty() {
            return Err(CoreError::config("site.default_language cannot be empty"));
        }

        if self.site.locales.keys().any(|suffix| suffix.is_empty()) {
            return Err(CoreError::config("site.locales suffixes cannot be empty"));
        }

        let in_range = |p: f32| (0.0..=1.0).contains(&p);
        if !in_range(self.sitemap.default_priority) {
            return Err(CoreError::config(
                "sitemap.default_priority must be between 0.0 and 1.0",
            ));
        }
        if let Some((path, _)) = self.sitemap.priorities.iter().find(|(_, p)| !in_range(**p)) {
            return Err(CoreError::config(format!(
                "sitemap.priorities.{path} must be between 0.0 and 1.0"
            )));
        }

        if !self
            .gallery
            .block_template
            .contains(&self.gallery.block_marker)
        {
            return Err(CoreError::config(
                "gallery.block_template must contain gallery.block_marker",
            ));
        }
        if !self.gallery.fragment.contains(&self.gallery.fragment_marker) {
            return Err(CoreError::config(
                "gallery.fragment must contain gallery.fragment_marker",
            ));
        }

        if self.build.workers == 0 {
            return Err(CoreError::config("build.workers must be at least 1"));
        }

        Ok(())
    }

    /// Get the full URL for a path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.site.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// URL of the generated sitemap.
    pub fn sitemap_url(&self) -> String {
        self.url_for("sitemap.xml")
    }

    /// Infer the language tag of a page from its file name.
    ///
    /// A configured suffix at the end of the file stem (`aboutfr.html`,
    /// `about.fr.html`) selects its tag; the longest matching suffix wins.
    pub fn locale_for(&self, file_name: &str) -> String {
        let stem = file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _ext)| stem);

        self.site
            .locales
            .iter()
            .filter(|(suffix, _)| stem.len() > suffix.len() && stem.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len())
            .map_or_else(
                || self.site.default_language.clone(),
                |(_, tag)| tag.clone(),
            )
    }

    /// Sitemap priority for a root-relative page path.
    pub fn priority_for(&self, path: &str) -> f32 {
        self.sitemap
            .priorities
            .get(path)
            .copied()
            .unwrap_or(self.sitemap.default_priority)
    }

    /// Whether a directory name is skipped during the walk.
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        ALWAYS_IGNORED_DIRS.contains(&name) || self.walk.ignore_dirs.iter().any(|d| d == name)
    }
}
