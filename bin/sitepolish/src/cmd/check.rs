//! Check command - validate configuration and discovery without writing

use std::path::Path;

use color_eyre::eyre::{Result, bail};
use sitepolish_core::{Config, SiteScanner, SiteTree};
use sitepolish_rewrite::rules::gallery_rules;

/// Validation result.
#[derive(Debug, Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Validates configuration and lists the pages a run would touch.
pub fn run(config_path: &Path, root: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, ?root, strict, "Checking configuration and site");

    let mut result = ValidationResult::default();

    println!("Checking configuration...");
    if !config_path.exists() {
        result.add_warning(format!(
            "Configuration file {} not found, using defaults",
            config_path.display()
        ));
    }
    let config = match Config::load_with_env(config_path) {
        Ok(config) => config,
        Err(e) => bail!("Configuration could not be read: {e}"),
    };
    match config.validate() {
        Ok(()) => println!("  ✓ Configuration valid"),
        Err(e) => {
            println!("  ✗ Configuration invalid: {e}");
            result.add_error(format!("Configuration error: {e}"));
        }
    }
    check_gallery_rules(&config, &mut result);

    println!("\nScanning {}...", root.display());
    match SiteScanner::new(&config, root).scan() {
        Ok(tree) => {
            print_tree(&config, &tree);
            check_gallery_pages(&config, &tree, &mut result);
        }
        Err(e) => {
            println!("  ✗ {e}");
            result.add_error(format!("Site root error: {e}"));
        }
    }

    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

fn print_tree(config: &Config, tree: &SiteTree) {
    println!(
        "  {} page(s), {} stylesheet(s)",
        tree.pages.len(),
        tree.stylesheets.len()
    );
    for page in &tree.pages {
        let sitemap = if page.in_sitemap(config.sitemap.max_depth) {
            "sitemap"
        } else {
            "-"
        };
        let gallery = if config.gallery.page(&page.path).is_some() {
            "gallery"
        } else {
            "-"
        };
        println!(
            "    {:<40} depth {} lang {:<5} {:<8} {}",
            page.path, page.depth, page.locale, sitemap, gallery
        );
    }
}

fn check_gallery_rules(config: &Config, result: &mut ValidationResult) {
    for page in &config.gallery.pages {
        if let Err(e) = gallery_rules(config, page) {
            result.add_error(format!("Gallery rules for {}: {e}", page.file));
        }
    }
}

fn check_gallery_pages(config: &Config, tree: &SiteTree, result: &mut ValidationResult) {
    for page in &config.gallery.pages {
        if !tree.pages.iter().any(|p| p.path == page.file) {
            result.add_warning(format!("Gallery page {} not found under the root", page.file));
        }
    }
}
