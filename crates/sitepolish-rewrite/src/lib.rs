//! sitepolish Rewrite Library
//!
//! Idempotent post-processing passes over a static site's generated files.
//!
//! # Modules
//!
//! - [`css`] - Lexical stylesheet minification into `.min.css` siblings
//! - [`markup`] - HTML documents edited by streaming through `lol_html`
//! - [`rules`] - Guarded rewrite rules and the rule engine
//! - [`enrich`] - Image dimension, loading, fit and alt enrichment
//! - [`seo`] - Language and meta tag normalization
//! - [`sitemap`] - XML sitemap generation
//! - [`robots`] - robots.txt generation
//! - [`pipeline`] - Run orchestration over a whole site

pub mod css;
pub mod enrich;
pub mod markup;
pub mod pipeline;
pub mod robots;
pub mod rules;
pub mod seo;
pub mod sitemap;

pub use css::{MinifiedStylesheet, StylesheetAsset, minify, minify_file};
pub use enrich::{DimensionProbe, ImageCrateProbe, ImageDimensions, ImageEnricher};
pub use markup::MarkupDocument;
pub use pipeline::{FileFailure, PassSummary, Pipeline, PipelineError, RunReport};
pub use robots::CrawlPolicy;
pub use rules::{Rewrite, RewriteRule, apply_rules, apply_rules_to, gallery_rules};
pub use seo::SeoNormalizer;
pub use sitemap::{SiteDescriptor, SitemapEntry, emit};
