//! Markup rewrite engine.
//!
//! A rule is a guarded structural edit. The engine runs rules in order on a
//! single document; every rule's guard reports `false` once its effect is
//! present, so re-running a rule set over its own output changes nothing.

use std::{collections::BTreeSet, fmt, path::Path};

use lol_html::html_content::ContentType;
use regex::Regex;
use sitepolish_core::{Config, GalleryPage};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    enrich::resolve_source,
    markup::{MarkupDocument, MarkupError, attr_selector, escape_attr},
};

/// Rule errors.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Markup error.
    #[error("markup error: {0}")]
    Markup(#[from] MarkupError),

    /// A configured pattern does not compile.
    #[error("invalid pattern for rule {rule}: {source}")]
    Pattern {
        rule: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Result type for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// A guarded, idempotent edit of one document.
pub trait RewriteRule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the edit still needs applying. Must return `false` when the
    /// rule's effect is already present or its trigger is absent.
    fn guard(&self, doc: &MarkupDocument) -> Result<bool>;

    /// Perform the edit, returning whether the document changed.
    fn apply(&self, doc: &mut MarkupDocument) -> Result<bool>;
}

impl fmt::Debug for dyn RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RewriteRule").field(&self.name()).finish()
    }
}

/// Result of running a rule set over document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Document text after all rules ran.
    pub text: String,

    /// Whether any rule edited the document.
    pub changed: bool,

    /// Names of the rules that edited, in order.
    pub applied: Vec<&'static str>,
}

/// Run `rules` in order over `doc`, returning the names of rules that edited.
pub fn apply_rules_to(
    doc: &mut MarkupDocument,
    rules: &[Box<dyn RewriteRule>],
) -> Result<Vec<&'static str>> {
    let mut applied = Vec::new();
    for rule in rules {
        if !rule.guard(doc)? {
            continue;
        }
        if rule.apply(doc)? {
            debug!(rule = rule.name(), "rule applied");
            applied.push(rule.name());
        }
    }
    Ok(applied)
}

/// Parse `text`, run `rules` in order and serialize the result.
///
/// When no rule edits, the returned text is the input unchanged.
pub fn apply_rules(text: &str, rules: &[Box<dyn RewriteRule>]) -> Result<Rewrite> {
    let mut doc = MarkupDocument::parse(text)?;
    let applied = apply_rules_to(&mut doc, rules)?;
    let changed = !applied.is_empty();
    Ok(Rewrite {
        text: if changed {
            doc.into_string()
        } else {
            text.to_string()
        },
        changed,
        applied,
    })
}

/// Link a stylesheet right after an anchor stylesheet.
#[derive(Debug, Clone)]
pub struct InjectStylesheet {
    /// href of the existing stylesheet to insert after.
    pub anchor_href: String,
    /// href of the stylesheet to add.
    pub href: String,
}

impl RewriteRule for InjectStylesheet {
    fn name(&self) -> &'static str {
        "inject-stylesheet"
    }

    fn guard(&self, doc: &MarkupDocument) -> Result<bool> {
        // A link already pointed at the minified sibling counts as present.
        let minified = PreferMinifiedStylesheets::minified_href(&self.href);
        let already_linked = doc.find_all_by_tag("link")?.iter().any(|link| {
            link.get("href")
                .is_some_and(|href| href == self.href || Some(href) == minified.as_deref())
        });
        if already_linked {
            return Ok(false);
        }
        Ok(doc.exists(&attr_selector("link", "href", &self.anchor_href))?)
    }

    fn apply(&self, doc: &mut MarkupDocument) -> Result<bool> {
        let tag = format!(
            "\n<link href=\"{}\" rel=\"stylesheet\"/>",
            escape_attr(&self.href)
        );
        Ok(doc.edit_first(&attr_selector("link", "href", &self.anchor_href), |el| {
            el.after(&tag, ContentType::Html);
            Ok(true)
        })?)
    }
}

/// Reference a script right after an anchor script.
#[derive(Debug, Clone)]
pub struct InjectScript {
    /// src of the existing script to insert after.
    pub anchor_src: String,
    /// src of the script to add.
    pub src: String,
}

impl RewriteRule for InjectScript {
    fn name(&self) -> &'static str {
        "inject-script"
    }

    fn guard(&self, doc: &MarkupDocument) -> Result<bool> {
        if doc.exists(&attr_selector("script", "src", &self.src))? {
            return Ok(false);
        }
        Ok(doc.exists(&attr_selector("script", "src", &self.anchor_src))?)
    }

    fn apply(&self, doc: &mut MarkupDocument) -> Result<bool> {
        let tag = format!("\n<script src=\"{}\"></script>", escape_attr(&self.src));
        Ok(doc.edit_first(&attr_selector("script", "src", &self.anchor_src), |el| {
            el.after(&tag, ContentType::Html);
            Ok(true)
        })?)
    }
}

/// Replace the first block matching a pattern with an enriched block.
#[derive(Debug, Clone)]
pub struct ReplaceBlock {
    /// Bounded nested-tag pattern locating the block.
    pub pattern: Regex,
    /// Literal replacement text.
    pub replacement: String,
    /// Substring proving the replacement is present.
    pub marker: String,
}

impl ReplaceBlock {
    /// Build from a pattern string.
    pub fn new(
        pattern: &str,
        replacement: impl Into<String>,
        marker: impl Into<String>,
    ) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| RuleError::Pattern {
            rule: "replace-block",
            source,
        })?;
        Ok(Self {
            pattern,
            replacement: replacement.into(),
            marker: marker.into(),
        })
    }
}

impl RewriteRule for ReplaceBlock {
    fn name(&self) -> &'static str {
        "replace-block"
    }

    fn guard(&self, doc: &MarkupDocument) -> Result<bool> {
        Ok(!doc.contains(&self.marker) && self.pattern.is_match(doc.as_str()))
    }

    fn apply(&self, doc: &mut MarkupDocument) -> Result<bool> {
        let candidates = doc.replace_first(&self.pattern, &self.replacement);
        if candidates > 1 {
            warn!(
                candidates,
                "multiple candidate blocks matched, only the first was replaced"
            );
        }
        Ok(candidates > 0)
    }
}

/// Strip inline style declarations from matching elements.
#[derive(Debug, Clone)]
pub struct StripInlineStyle {
    /// Tag whose `style` attribute is stripped.
    pub tag: String,
    /// Properties kept (case-insensitive).
    pub preserve: Vec<String>,
}

impl StripInlineStyle {
    fn selector(&self) -> String {
        format!("{}[style]", self.tag)
    }

    fn is_preserved(&self, declaration: &str) -> bool {
        let property = declaration
            .split_once(':')
            .map_or(declaration, |(property, _)| property)
            .trim();
        self.preserve
            .iter()
            .any(|p| p.eq_ignore_ascii_case(property))
    }

    /// Remaining style after stripping, `None` when nothing is kept.
    fn stripped(&self, style: &str) -> Option<String> {
        let kept: Vec<&str> = style
            .split(';')
            .map(str::trim)
            .filter(|d| !d.is_empty() && self.is_preserved(d))
            .collect();
        if kept.is_empty() {
            None
        } else {
            Some(kept.iter().map(|d| format!("{d};")).collect::<Vec<_>>().join(" "))
        }
    }

    fn needs_stripping(&self, style: &str) -> bool {
        style
            .split(';')
            .map(str::trim)
            .any(|d| !d.is_empty() && !self.is_preserved(d))
    }
}

impl RewriteRule for StripInlineStyle {
    fn name(&self) -> &'static str {
        "strip-inline-style"
    }

    fn guard(&self, doc: &MarkupDocument) -> Result<bool> {
        Ok(doc
            .find_all(&self.selector())?
            .iter()
            .any(|el| el.get("style").is_some_and(|s| self.needs_stripping(s))))
    }

    fn apply(&self, doc: &mut MarkupDocument) -> Result<bool> {
        let edited = doc.edit(&self.selector(), |el| {
            let Some(style) = el.get_attribute("style") else {
                return Ok(false);
            };
            if !self.needs_stripping(&style) {
                return Ok(false);
            }
            match self.stripped(&style) {
                Some(kept) => el.set_attribute("style", &kept)?,
                None => el.remove_attribute("style"),
            }
            Ok(true)
        })?;
        Ok(edited > 0)
    }
}

/// Give the first container with an exact class an identifying id.
#[derive(Debug, Clone)]
pub struct TagContainer {
    /// Container tag.
    pub tag: String,
    /// Exact class attribute value the container must have.
    pub class: String,
    /// Class appended to the container.
    pub extra_class: String,
    /// Id given to the container.
    pub id: String,
}

impl RewriteRule for TagContainer {
    fn name(&self) -> &'static str {
        "tag-container"
    }

    fn guard(&self, doc: &MarkupDocument) -> Result<bool> {
        if doc.exists(&attr_selector("*", "id", &self.id))? {
            return Ok(false);
        }
        Ok(doc.exists(&attr_selector(&self.tag, "class", &self.class))?)
    }

    fn apply(&self, doc: &mut MarkupDocument) -> Result<bool> {
        let class = if self.extra_class.is_empty() {
            self.class.clone()
        } else {
            format!("{} {}", self.class, self.extra_class)
        };
        Ok(doc.edit_first(&attr_selector(&self.tag, "class", &self.class), |el| {
            el.set_attribute("class", &class)?;
            el.set_attribute("id", &self.id)?;
            Ok(true)
        })?)
    }
}

/// Insert a fixed fragment at the end of the body.
#[derive(Debug, Clone)]
pub struct AppendFragment {
    /// HTML inserted before the closing body tag.
    pub fragment: String,
    /// Substring proving the fragment is present.
    pub marker: String,
}

impl RewriteRule for AppendFragment {
    fn name(&self) -> &'static str {
        "append-fragment"
    }

    fn guard(&self, doc: &MarkupDocument) -> Result<bool> {
        Ok(!doc.contains(&self.marker) && doc.exists("body")?)
    }

    fn apply(&self, doc: &mut MarkupDocument) -> Result<bool> {
        if doc.has_end_tag("body") {
            return Ok(doc.edit_first("body", |el| {
                el.append(&self.fragment, ContentType::Html);
                Ok(true)
            })?);
        }
        // Implied `</body>`: the body runs to the end of the document.
        doc.append_to_document(&self.fragment);
        Ok(true)
    }
}

/// Replace a placeholder attribute value with a category-specific one.
#[derive(Debug, Clone)]
pub struct ReplacePlaceholderAttr {
    /// Element tag.
    pub tag: String,
    /// Attribute carrying the placeholder.
    pub attribute: String,
    /// Placeholder value to replace.
    pub placeholder: String,
    /// Replacement value.
    pub value: String,
}

impl ReplacePlaceholderAttr {
    fn selector(&self) -> String {
        attr_selector(&self.tag, &self.attribute, &self.placeholder)
    }
}

impl RewriteRule for ReplacePlaceholderAttr {
    fn name(&self) -> &'static str {
        "replace-placeholder"
    }

    fn guard(&self, doc: &MarkupDocument) -> Result<bool> {
        if self.value == self.placeholder {
            return Ok(false);
        }
        Ok(doc.exists(&self.selector())?)
    }

    fn apply(&self, doc: &mut MarkupDocument) -> Result<bool> {
        let edited = doc.edit(&self.selector(), |el| {
            el.set_attribute(&self.attribute, &self.value)?;
            Ok(true)
        })?;
        Ok(edited > 0)
    }
}

/// Point local stylesheet links at their existing `.min.css` siblings.
#[derive(Debug, Clone, Default)]
pub struct PreferMinifiedStylesheets {
    /// hrefs (as written in the page) whose minified sibling exists.
    pub available: BTreeSet<String>,
}

impl PreferMinifiedStylesheets {
    /// Minified counterpart of an href, if it is a local unminified stylesheet.
    pub fn minified_href(href: &str) -> Option<String> {
        let lower = href.to_ascii_lowercase();
        let remote = lower.starts_with("http:")
            || lower.starts_with("https:")
            || lower.starts_with("//")
            || lower.starts_with("data:");
        if remote || !lower.ends_with(".css") || lower.ends_with(".min.css") {
            return None;
        }
        Some(format!("{}.min.css", &href[..href.len() - ".css".len()]))
    }

    /// Collect the stylesheet hrefs of `doc` whose minified sibling passes
    /// `is_available`. Hrefs resolve like image sources.
    pub fn discover(
        doc: &MarkupDocument,
        page_dir: &Path,
        root: &Path,
        is_available: impl Fn(&Path) -> bool,
    ) -> Result<Self> {
        let available = doc
            .find_all(r#"link[rel="stylesheet"][href]"#)?
            .into_iter()
            .filter_map(|link| link.get("href").map(str::to_string))
            .filter(|href| {
                Self::minified_href(href)
                    .and_then(|minified| resolve_source(&minified, page_dir, root))
                    .is_some_and(|path| is_available(&path))
            })
            .collect();
        Ok(Self { available })
    }

    fn target(&self, href: &str) -> Option<String> {
        Self::minified_href(href).filter(|_| self.available.contains(href))
    }
}

impl RewriteRule for PreferMinifiedStylesheets {
    fn name(&self) -> &'static str {
        "prefer-minified-stylesheets"
    }

    fn guard(&self, doc: &MarkupDocument) -> Result<bool> {
        Ok(doc
            .find_all(r#"link[rel="stylesheet"][href]"#)?
            .iter()
            .filter_map(|link| link.get("href"))
            .any(|href| self.target(href).is_some()))
    }

    fn apply(&self, doc: &mut MarkupDocument) -> Result<bool> {
        let edited = doc.edit(r#"link[rel="stylesheet"][href]"#, |el| {
            let Some(target) = el.get_attribute("href").and_then(|href| self.target(&href)) else {
                return Ok(false);
            };
            el.set_attribute("href", &target)?;
            Ok(true)
        })?;
        Ok(edited > 0)
    }
}

/// The gallery rule set for one page, in application order.
pub fn gallery_rules(config: &Config, page: &GalleryPage) -> Result<Vec<Box<dyn RewriteRule>>> {
    let gallery = &config.gallery;

    let mut rules: Vec<Box<dyn RewriteRule>> = vec![
        Box::new(InjectStylesheet {
            anchor_href: gallery.anchor_stylesheet.clone(),
            href: gallery.stylesheet.clone(),
        }),
        Box::new(ReplaceBlock::new(
            &gallery.block_pattern,
            gallery.block_template.replace("{category}", &page.category),
            gallery.block_marker.clone(),
        )?),
        Box::new(StripInlineStyle {
            tag: gallery.strip_style_tag.clone(),
            preserve: gallery.preserve_styles.clone(),
        }),
        Box::new(TagContainer {
            tag: gallery.container_tag.clone(),
            class: gallery.container_class.clone(),
            extra_class: gallery.container_extra_class.clone(),
            id: gallery.container_id.clone(),
        }),
        Box::new(InjectScript {
            anchor_src: gallery.anchor_script.clone(),
            src: gallery.script.clone(),
        }),
        Box::new(AppendFragment {
            fragment: gallery.fragment.clone(),
            marker: gallery.fragment_marker.clone(),
        }),
    ];

    if let Some(alt) = &page.alt {
        rules.push(Box::new(ReplacePlaceholderAttr {
            tag: "img".to_string(),
            attribute: "alt".to_string(),
            placeholder: gallery.alt_placeholder.clone(),
            value: alt.clone(),
        }));
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GALLERY: &str = r#"<!DOCTYPE html>
<html>
<head>
<link href="css/style.css" rel="stylesheet"/>
<link href="css/animations.css" rel="stylesheet"/>
</head>
<body>
<div class="col-md-7">
<div class="row mb-5">
<div class="col-12">
<h2 class="site-section-heading text-center">Wedding Gallery</h2>
</div>
</div>
</div>
<div class="row">
<img src="images/w1.jpg" alt="Image" style="width: 300px; height: 200px">
<img src="images/w2.jpg" alt="Image" style="object-fit: cover;">
</div>
<script src="js/performance.js"></script>
</body>
</html>"#;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.site.base_url = "https://example.com".to_string();
        config
    }

    fn wedding() -> GalleryPage {
        GalleryPage {
            file: "wedding.html".to_string(),
            category: "Wedding".to_string(),
            alt: Some("Wedding Photography".to_string()),
        }
    }

    fn single(rule: impl RewriteRule + 'static) -> Vec<Box<dyn RewriteRule>> {
        vec![Box::new(rule)]
    }

    #[test]
    fn test_inject_stylesheet() {
        let rules = single(InjectStylesheet {
            anchor_href: "css/animations.css".to_string(),
            href: "css/gallery.css".to_string(),
        });

        let first = apply_rules(GALLERY, &rules).unwrap();
        assert!(first.changed);
        assert!(first.text.contains(
            "<link href=\"css/animations.css\" rel=\"stylesheet\"/>\n<link href=\"css/gallery.css\" rel=\"stylesheet\"/>"
        ));

        let second = apply_rules(&first.text, &rules).unwrap();
        assert!(!second.changed);
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn test_inject_stylesheet_sees_minified_target() {
        let html = GALLERY.replace(
            "css/animations.css\" rel=\"stylesheet\"/>",
            "css/animations.css\" rel=\"stylesheet\"/>\n<link href=\"css/gallery.min.css\" rel=\"stylesheet\"/>",
        );
        let rules = single(InjectStylesheet {
            anchor_href: "css/animations.css".to_string(),
            href: "css/gallery.css".to_string(),
        });

        assert!(!apply_rules(&html, &rules).unwrap().changed);
    }

    #[test]
    fn test_inject_stylesheet_without_anchor_is_noop() {
        let rules = single(InjectStylesheet {
            anchor_href: "css/missing.css".to_string(),
            href: "css/gallery.css".to_string(),
        });

        let rewrite = apply_rules(GALLERY, &rules).unwrap();
        assert!(!rewrite.changed);
        assert_eq!(rewrite.text, GALLERY);
    }

    #[test]
    fn test_inject_script() {
        let rules = single(InjectScript {
            anchor_src: "js/performance.js".to_string(),
            src: "js/gallery.js".to_string(),
        });

        let first = apply_rules(GALLERY, &rules).unwrap();
        assert!(first.text.contains(
            "<script src=\"js/performance.js\"></script>\n<script src=\"js/gallery.js\"></script>"
        ));
        assert!(!apply_rules(&first.text, &rules).unwrap().changed);
    }

    #[test]
    fn test_replace_block_first_match_only() {
        let html = r#"<div class="box"><h2>A</h2></div><div class="box"><h2>B</h2></div>"#;
        let rules = single(
            ReplaceBlock::new(
                r#"<div class="box"><h2>[A-Z]</h2></div>"#,
                r#"<div class="box cta"><h2>New</h2></div>"#,
                "box cta",
            )
            .unwrap(),
        );

        let first = apply_rules(html, &rules).unwrap();
        assert_eq!(
            first.text,
            r#"<div class="box cta"><h2>New</h2></div><div class="box"><h2>B</h2></div>"#
        );
        assert!(!apply_rules(&first.text, &rules).unwrap().changed);
    }

    #[test]
    fn test_replace_block_no_match_is_noop() {
        let rules = single(ReplaceBlock::new("<section>", "<section class=\"x\">", "x").unwrap());
        assert!(!apply_rules(GALLERY, &rules).unwrap().changed);
    }

    #[test]
    fn test_replace_block_invalid_pattern() {
        let err = ReplaceBlock::new("(unclosed", "", "m").unwrap_err();
        assert!(matches!(err, RuleError::Pattern { .. }));
    }

    #[test]
    fn test_strip_inline_style_keeps_preserved() {
        let rules = single(StripInlineStyle {
            tag: "img".to_string(),
            preserve: vec!["object-fit".to_string()],
        });

        let first = apply_rules(GALLERY, &rules).unwrap();
        assert!(first.changed);
        assert!(first.text.contains(r#"<img src="images/w1.jpg" alt="Image">"#));
        assert!(first.text.contains(r#"style="object-fit: cover;""#));
        assert!(!apply_rules(&first.text, &rules).unwrap().changed);
    }

    #[test]
    fn test_strip_inline_style_partial() {
        let rule = StripInlineStyle {
            tag: "img".to_string(),
            preserve: vec!["object-fit".to_string()],
        };
        assert_eq!(
            rule.stripped("width: 10px; object-fit: cover"),
            Some("object-fit: cover;".to_string())
        );
        assert_eq!(rule.stripped("width: 10px"), None);
        assert!(!rule.needs_stripping("OBJECT-FIT: contain;"));
    }

    #[test]
    fn test_tag_container() {
        let rules = single(TagContainer {
            tag: "div".to_string(),
            class: "row".to_string(),
            extra_class: "gallery-grid".to_string(),
            id: "lightgallery".to_string(),
        });

        let first = apply_rules(GALLERY, &rules).unwrap();
        assert!(first.text.contains(r#"<div class="row gallery-grid" id="lightgallery">"#));
        // Only the exact class matches, not "row mb-5".
        assert!(first.text.contains(r#"<div class="row mb-5">"#));
        assert!(!apply_rules(&first.text, &rules).unwrap().changed);
    }

    #[test]
    fn test_append_fragment() {
        let rules = single(AppendFragment {
            fragment: "<a class=\"floating-book-btn\" href=\"contact.html\">Book</a>\n".to_string(),
            marker: "floating-book-btn".to_string(),
        });

        let first = apply_rules(GALLERY, &rules).unwrap();
        assert!(
            first
                .text
                .contains("<a class=\"floating-book-btn\" href=\"contact.html\">Book</a>\n</body>")
        );
        assert!(!apply_rules(&first.text, &rules).unwrap().changed);
    }

    #[test]
    fn test_append_fragment_with_implied_body_end() {
        let rules = single(AppendFragment {
            fragment: "<a class=\"floating-book-btn\">Book</a>".to_string(),
            marker: "floating-book-btn".to_string(),
        });

        let first = apply_rules("<html><head></head><body><p>hi</p>", &rules).unwrap();
        assert!(first.changed);
        assert_eq!(
            first.text,
            "<html><head></head><body><p>hi</p><a class=\"floating-book-btn\">Book</a>"
        );

        let second = apply_rules(&first.text, &rules).unwrap();
        assert!(!second.changed);
        assert_eq!(second.text, first.text);

        let closed = apply_rules("<body><p>hi</p>\n</html>", &rules).unwrap();
        assert_eq!(
            closed.text,
            "<body><p>hi</p>\n<a class=\"floating-book-btn\">Book</a></html>"
        );
    }

    #[test]
    fn test_append_fragment_without_body() {
        let rules = single(AppendFragment {
            fragment: "<p>x</p>".to_string(),
            marker: "x-marker".to_string(),
        });
        assert!(!apply_rules("<div>no body</div>", &rules).unwrap().changed);
    }

    #[test]
    fn test_replace_placeholder_attr() {
        let rules = single(ReplacePlaceholderAttr {
            tag: "img".to_string(),
            attribute: "alt".to_string(),
            placeholder: "Image".to_string(),
            value: "Wedding Photography".to_string(),
        });

        let first = apply_rules(GALLERY, &rules).unwrap();
        assert_eq!(first.text.matches(r#"alt="Wedding Photography""#).count(), 2);
        assert!(!first.text.contains(r#"alt="Image""#));
        assert!(!apply_rules(&first.text, &rules).unwrap().changed);
    }

    #[test]
    fn test_prefer_minified_stylesheets() {
        let rules = single(PreferMinifiedStylesheets {
            available: BTreeSet::from(["css/style.css".to_string()]),
        });

        let first = apply_rules(GALLERY, &rules).unwrap();
        assert!(first.text.contains(r#"href="css/style.min.css""#));
        assert!(first.text.contains(r#"href="css/animations.css""#));
        assert!(!apply_rules(&first.text, &rules).unwrap().changed);
    }

    #[test]
    fn test_discover_checks_resolved_paths() {
        let doc = MarkupDocument::parse(GALLERY).unwrap();
        let rule = PreferMinifiedStylesheets::discover(
            &doc,
            Path::new("/site/gallery"),
            Path::new("/site"),
            |path| path == Path::new("/site/gallery/css/animations.min.css"),
        )
        .unwrap();

        assert_eq!(
            rule.available,
            BTreeSet::from(["css/animations.css".to_string()])
        );
    }

    #[test]
    fn test_minified_href() {
        assert_eq!(
            PreferMinifiedStylesheets::minified_href("css/a.css"),
            Some("css/a.min.css".to_string())
        );
        assert_eq!(PreferMinifiedStylesheets::minified_href("css/a.min.css"), None);
        assert_eq!(
            PreferMinifiedStylesheets::minified_href("https://cdn.example.com/a.css"),
            None
        );
        assert_eq!(PreferMinifiedStylesheets::minified_href("font.woff"), None);
    }

    #[test]
    fn test_gallery_rules_full_set_is_idempotent() {
        let config = test_config();
        let rules = gallery_rules(&config, &wedding()).unwrap();

        let first = apply_rules(GALLERY, &rules).unwrap();
        assert!(first.changed);
        assert_eq!(
            first.applied,
            vec![
                "inject-stylesheet",
                "replace-block",
                "strip-inline-style",
                "tag-container",
                "inject-script",
                "append-fragment",
                "replace-placeholder",
            ]
        );
        assert!(first.text.contains("Book Your Wedding Session"));

        let second = apply_rules(&first.text, &rules).unwrap();
        assert!(!second.changed);
        assert!(second.applied.is_empty());
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn test_gallery_rules_idempotent_with_implied_end_tags() {
        let config = test_config();
        let rules = gallery_rules(&config, &wedding()).unwrap();
        let html = GALLERY
            .replace("</head>\n", "")
            .replace("</body>\n</html>", "");

        let first = apply_rules(&html, &rules).unwrap();
        assert!(first.applied.contains(&"append-fragment"));
        assert!(first.text.contains("Book Your Wedding Session"));
        assert!(first.text.contains("floating-book-btn"));

        let second = apply_rules(&first.text, &rules).unwrap();
        assert!(!second.changed);
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn test_later_rule_sees_earlier_edit() {
        // The second rule anchors on the stylesheet the first one injects.
        let rules: Vec<Box<dyn RewriteRule>> = vec![
            Box::new(InjectStylesheet {
                anchor_href: "css/animations.css".to_string(),
                href: "css/one.css".to_string(),
            }),
            Box::new(InjectStylesheet {
                anchor_href: "css/one.css".to_string(),
                href: "css/two.css".to_string(),
            }),
        ];

        let rewrite = apply_rules(GALLERY, &rules).unwrap();
        assert_eq!(rewrite.applied.len(), 2);
        assert!(rewrite.text.contains(
            "<link href=\"css/one.css\" rel=\"stylesheet\"/>\n<link href=\"css/two.css\" rel=\"stylesheet\"/>"
        ));
    }
}
