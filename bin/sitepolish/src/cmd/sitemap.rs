//! Sitemap command - sitemap.xml and robots.txt only

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use sitepolish_rewrite::Pipeline;

use super::{load_config, print_report};

/// Run the sitemap command.
pub fn run(config_path: &Path, root: &Path, base_url: Option<&str>) -> Result<()> {
    tracing::info!(?config_path, ?root, ?base_url, "Generating sitemap");

    let config = load_config(config_path, base_url)?;
    let report = Pipeline::new(config, root)
        .wrap_err("Failed to prepare pipeline")?
        .run_sitemap()
        .wrap_err("Sitemap generation failed")?;

    print_report(&report, false);

    if report.has_failures() {
        bail!("Failed to write sitemap files");
    }
    Ok(())
}
