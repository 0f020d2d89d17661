//! Pipeline orchestration.
//!
//! Runs discovery, stylesheet minification, the per-document passes and the
//! sitemap emitter in that order. Per-file work runs on a bounded rayon pool;
//! a failing file is logged, counted and skipped.

use std::{
    collections::{HashMap, HashSet},
    fmt, fs,
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::NaiveDate;
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use sitepolish_core::{Config, CoreError, PageDescriptor, SiteScanner, SiteTree};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    css::{self, MinifyError},
    enrich::{DimensionProbe, EnrichError, ImageEnricher},
    markup::{MarkupDocument, MarkupError},
    rules::{self, PreferMinifiedStylesheets, RewriteRule, RuleError},
    seo::SeoNormalizer,
    sitemap::{self, SitemapError},
};

/// Pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Discovery or configuration error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Markup error.
    #[error("markup error: {0}")]
    Markup(#[from] MarkupError),

    /// Rewrite rule error.
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    /// Image enrichment error.
    #[error("enrichment error: {0}")]
    Enrich(#[from] EnrichError),

    /// Stylesheet minification error.
    #[error("minify error: {0}")]
    Minify(#[from] MinifyError),

    /// Sitemap or robots.txt error.
    #[error("sitemap error: {0}")]
    Sitemap(#[from] SitemapError),

    /// Worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Per-pass file counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub processed: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl PassSummary {
    fn record_changed(&mut self, changed: bool) {
        self.processed += 1;
        if changed {
            self.changed += 1;
        } else {
            self.unchanged += 1;
        }
    }

    fn record_failed(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} changed, {} unchanged, {} failed",
            self.processed, self.changed, self.unchanged, self.failed
        )
    }
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Stylesheet minification counts.
    pub stylesheets: PassSummary,

    /// HTML document counts.
    pub documents: PassSummary,

    /// Every per-file failure, stylesheets first, in path order.
    pub failures: Vec<FileFailure>,

    /// Entries written to the sitemap (0 when it was not emitted).
    pub sitemap_entries: usize,

    /// Run duration in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    /// Whether any file failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Site post-processing pipeline.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    root: PathBuf,
    dry_run: bool,
    workers: usize,
    today: Option<NaiveDate>,
    seo: SeoNormalizer,
    enricher: ImageEnricher,
    gallery: HashMap<String, Vec<Box<dyn RewriteRule>>>,
}

impl Pipeline {
    /// Create a pipeline for the site at `root`.
    ///
    /// Fails when a configured gallery pattern does not compile.
    pub fn new(config: Config, root: impl Into<PathBuf>) -> Result<Self> {
        let gallery = config
            .gallery
            .pages
            .iter()
            .map(|page| Ok((page.file.clone(), rules::gallery_rules(&config, page)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            root: root.into(),
            dry_run: config.build.dry_run,
            workers: config.build.workers.max(1),
            today: None,
            seo: SeoNormalizer::new(&config.seo),
            enricher: ImageEnricher::with_image_probe(config.images.clone()),
            gallery,
            config,
        })
    }

    /// Compute changes without writing anything.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Replace the image dimension probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn DimensionProbe>) -> Self {
        self.enricher = ImageEnricher::new(self.config.images.clone(), probe);
        self
    }

    /// Date written as `lastmod`; defaults to today in local time.
    #[must_use]
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Site root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discover pages and stylesheets.
    pub fn scan(&self) -> Result<SiteTree> {
        Ok(SiteScanner::new(&self.config, &self.root).scan()?)
    }

    /// Run every enabled pass.
    pub fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        info!(root = %self.root.display(), dry_run = self.dry_run, "starting run");

        let tree = self.scan()?;
        let pool = self.thread_pool()?;
        let mut report = RunReport::default();

        let planned = if self.config.css.enabled {
            self.minify_stylesheets(&pool, &tree, &mut report)
        } else {
            HashSet::new()
        };
        self.rewrite_documents(&pool, &tree, &planned, &mut report);
        self.emit_site_files(&tree, &mut report);

        report.duration_ms = start.elapsed().as_millis() as u64;
        log_report(&report);
        Ok(report)
    }

    /// Run stylesheet minification only.
    pub fn run_minify(&self) -> Result<RunReport> {
        let start = Instant::now();
        let tree = self.scan()?;
        let pool = self.thread_pool()?;
        let mut report = RunReport::default();

        self.minify_stylesheets(&pool, &tree, &mut report);

        report.duration_ms = start.elapsed().as_millis() as u64;
        log_report(&report);
        Ok(report)
    }

    /// Run discovery and the sitemap emitter only.
    pub fn run_sitemap(&self) -> Result<RunReport> {
        let start = Instant::now();
        let tree = self.scan()?;
        let mut report = RunReport::default();

        self.emit_site_files(&tree, &mut report);

        report.duration_ms = start.elapsed().as_millis() as u64;
        log_report(&report);
        Ok(report)
    }

    fn thread_pool(&self) -> Result<ThreadPool> {
        Ok(ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("sitepolish-{i}"))
            .build()?)
    }

    /// Minify every source stylesheet, returning the derived paths that exist
    /// (or would exist, in a dry run) afterwards.
    fn minify_stylesheets(
        &self,
        pool: &ThreadPool,
        tree: &SiteTree,
        report: &mut RunReport,
    ) -> HashSet<PathBuf> {
        info!(count = tree.stylesheets.len(), "minifying stylesheets");

        let results: Vec<_> = pool.install(|| {
            tree.stylesheets
                .par_iter()
                .map(|source| (source, css::minify_file(source, self.dry_run)))
                .collect()
        });

        let mut planned = HashSet::new();
        for (source, result) in results {
            match result {
                Ok(outcome) => {
                    report.stylesheets.record_changed(outcome.changed);
                    planned.insert(outcome.derived_path);
                }
                Err(e) => {
                    warn!(path = %source.display(), error = %e, "failed to minify stylesheet");
                    report.stylesheets.record_failed();
                    report.failures.push(FileFailure {
                        path: source.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        planned
    }

    fn rewrite_documents(
        &self,
        pool: &ThreadPool,
        tree: &SiteTree,
        planned: &HashSet<PathBuf>,
        report: &mut RunReport,
    ) {
        info!(count = tree.pages.len(), "rewriting documents");

        let results: Vec<_> = pool.install(|| {
            tree.pages
                .par_iter()
                .map(|page| {
                    let path = tree.page_path(page);
                    let result = self.rewrite_document(page, &path, planned);
                    (path, result)
                })
                .collect()
        });

        for (path, result) in results {
            match result {
                Ok(changed) => report.documents.record_changed(changed),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to rewrite document");
                    report.documents.record_failed();
                    report.failures.push(FileFailure {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// Run the rule set, SEO and enrichment passes over one page.
    fn rewrite_document(
        &self,
        page: &PageDescriptor,
        path: &Path,
        planned: &HashSet<PathBuf>,
    ) -> Result<bool> {
        let mut doc = MarkupDocument::from_bytes(fs::read(path)?)?;
        let page_dir = path.parent().unwrap_or(self.root.as_path());

        let mut changed = false;

        if let Some(rules) = self.gallery.get(&page.path) {
            let applied = rules::apply_rules_to(&mut doc, rules)?;
            changed |= !applied.is_empty();
        }

        if self.config.css.rewrite_references {
            let rule = PreferMinifiedStylesheets::discover(&doc, page_dir, &self.root, |p| {
                planned.contains(p) || p.is_file()
            })?;
            let rules: [Box<dyn RewriteRule>; 1] = [Box::new(rule)];
            changed |= !rules::apply_rules_to(&mut doc, &rules)?.is_empty();
        }

        if self.config.seo.enabled {
            changed |= self.seo.normalize(&mut doc, &page.locale)?;
        }

        if self.config.images.enabled {
            changed |= self.enricher.enrich(&mut doc, page_dir, &self.root)?;
        }

        if changed && !self.dry_run {
            fs::write(path, doc.as_str())?;
            debug!(path = %path.display(), "rewrote document");
        }

        Ok(changed)
    }

    fn emit_site_files(&self, tree: &SiteTree, report: &mut RunReport) {
        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let (site, policy) = sitemap::emit(&tree.pages, &self.config, today);

        if self.config.sitemap.enabled {
            report.sitemap_entries = site.entries.len();
            if !self.dry_run {
                if let Err(e) = site.write(&self.root) {
                    self.record_emit_failure(report, "sitemap.xml", e);
                }
            }
        }

        if self.config.robots.enabled && !self.dry_run {
            if let Err(e) = policy.write(&self.root) {
                self.record_emit_failure(report, "robots.txt", e);
            }
        }
    }

    fn record_emit_failure(&self, report: &mut RunReport, name: &str, error: SitemapError) {
        let path = self.root.join(name);
        warn!(path = %path.display(), error = %error, "failed to write site file");
        report.failures.push(FileFailure {
            path,
            message: error.to_string(),
        });
    }
}

fn log_report(report: &RunReport) {
    info!(
        stylesheets = %report.stylesheets,
        documents = %report.documents,
        sitemap_entries = report.sitemap_entries,
        failures = report.failures.len(),
        duration_ms = report.duration_ms,
        "run complete"
    );
}
