//! Command implementations.

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use sitepolish_core::Config;
use sitepolish_rewrite::RunReport;

pub mod check;
pub mod minify;
pub mod run;
pub mod sitemap;

/// Load configuration, apply a base URL override, then validate.
///
/// A missing file yields the default configuration.
pub(crate) fn load_config(config_path: &Path, base_url: Option<&str>) -> Result<Config> {
    let mut config = Config::load_with_env(config_path)
        .wrap_err_with(|| format!("Failed to load configuration from {}", config_path.display()))?;

    if let Some(url) = base_url {
        tracing::info!(base_url = url, "Overriding site base URL from CLI");
        config.site.base_url = url.to_string();
    }

    config.validate().wrap_err("Invalid configuration")?;
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Print the end-of-run summary.
pub(crate) fn print_report(report: &RunReport, dry_run: bool) {
    println!();
    if dry_run {
        println!("  Dry run: no files were written.");
        println!();
    }
    println!("  Stylesheets: {}", report.stylesheets);
    println!("  Documents:   {}", report.documents);
    println!("  Sitemap:     {} entries", report.sitemap_entries);
    println!();
    println!("  Duration:    {:.2}s", report.duration_ms as f64 / 1000.0);

    if report.has_failures() {
        println!();
        println!("  Failures:");
        for failure in &report.failures {
            println!("  ✗ {}: {}", failure.path.display(), failure.message);
        }
    }
    println!();
}
