//! Run command - the full pipeline

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr, bail};
use sitepolish_rewrite::Pipeline;

use super::{load_config, print_report};

/// Run the run command.
///
/// Minifies stylesheets, rewrites every page and regenerates sitemap.xml and
/// robots.txt under `root`.
pub fn run(
    config_path: &Path,
    root: &Path,
    dry_run: bool,
    jobs: Option<usize>,
    base_url: Option<&str>,
    strict: bool,
) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_path, ?root, dry_run, ?jobs, strict, "Starting run");

    let config = load_config(config_path, base_url)?;

    let mut pipeline = Pipeline::new(config, root)
        .wrap_err("Failed to prepare pipeline")?
        .with_dry_run(dry_run);
    if let Some(jobs) = jobs {
        pipeline = pipeline.with_workers(jobs);
    }

    let report = pipeline.run().wrap_err("Run failed")?;

    println!();
    println!("  Run completed for {}", root.display());
    print_report(&report, dry_run);

    tracing::info!(?report, duration = ?start.elapsed(), "Run completed");

    if strict && report.has_failures() {
        bail!(
            "{} file(s) failed (strict mode)",
            report.failures.len()
        );
    }

    Ok(())
}
