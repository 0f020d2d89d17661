//! Minify command - stylesheets only

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use sitepolish_core::Config;
use sitepolish_rewrite::Pipeline;

use super::print_report;

/// Run the minify command.
///
/// Writes a `.min.css` sibling for every source stylesheet under `root`.
/// The base URL is not needed here, so configuration is not validated.
pub fn run(config_path: &Path, root: &Path, dry_run: bool) -> Result<()> {
    tracing::info!(?config_path, ?root, dry_run, "Minifying stylesheets");

    let config = Config::load_with_env(config_path).wrap_err("Failed to load configuration")?;

    let report = Pipeline::new(config, root)
        .wrap_err("Failed to prepare pipeline")?
        .with_dry_run(dry_run)
        .run_minify()
        .wrap_err("Minification failed")?;

    print_report(&report, dry_run);
    Ok(())
}
