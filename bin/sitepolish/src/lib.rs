//! sitepolish CLI Library
//!
//! Command implementations for the `sitepolish` binary, exposed as a library
//! so they can be tested and reused.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (run, minify, sitemap, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use sitepolish::cmd;
//!
//! // Post-process the site in ./public
//! cmd::run::run(
//!     Path::new("sitepolish.toml"),
//!     Path::new("public"),
//!     false,
//!     None,
//!     None,
//!     false,
//! )
//! .unwrap();
//! ```

pub mod cmd;

// Re-export core types for convenience
pub use sitepolish_core::{Config, SiteScanner, SiteTree};
pub use sitepolish_rewrite::{Pipeline, RunReport};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
