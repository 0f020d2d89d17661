//! sitepolish CLI
//!
//! Post-processes a generated static site in place.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for sitepolish.
#[derive(Parser)]
#[command(
    name = "sitepolish",
    version,
    about = "Minify CSS, enrich HTML and emit sitemap/robots for a static site"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sitepolish.toml")]
    config: PathBuf,

    /// Site root directory
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Run the full pipeline
    Run {
        /// Report changes without writing files
        #[arg(long)]
        dry_run: bool,
        /// Worker threads (defaults to build.workers)
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Override site base URL (e.g., https://example.com)
        #[arg(long)]
        base_url: Option<String>,
        /// Exit with an error when any file fails
        #[arg(long)]
        strict: bool,
    },
    /// Minify stylesheets only
    Minify {
        /// Report changes without writing files
        #[arg(long)]
        dry_run: bool,
    },
    /// Regenerate sitemap.xml and robots.txt only
    Sitemap {
        /// Override site base URL (e.g., https://example.com)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Validate configuration and list discovered pages
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    sitepolish::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            dry_run,
            jobs,
            base_url,
            strict,
        } => {
            sitepolish::cmd::run::run(
                &cli.config,
                &cli.root,
                dry_run,
                jobs,
                base_url.as_deref(),
                strict,
            )?;
        }
        Commands::Minify { dry_run } => {
            sitepolish::cmd::minify::run(&cli.config, &cli.root, dry_run)?;
        }
        Commands::Sitemap { base_url } => {
            sitepolish::cmd::sitemap::run(&cli.config, &cli.root, base_url.as_deref())?;
        }
        Commands::Check { strict } => {
            sitepolish::cmd::check::run(&cli.config, &cli.root, strict)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_run_command_parsing() {
        let args = ["sitepolish", "run"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, PathBuf::from("sitepolish.toml"));
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Run {
                dry_run,
                jobs,
                base_url,
                strict,
            } => {
                assert!(!dry_run);
                assert!(jobs.is_none());
                assert!(base_url.is_none());
                assert!(!strict);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_run_with_options() {
        let args = [
            "sitepolish",
            "run",
            "--dry-run",
            "--jobs",
            "8",
            "--base-url",
            "https://example.com",
            "--strict",
        ];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Run {
                dry_run,
                jobs,
                base_url,
                strict,
            } => {
                assert!(dry_run);
                assert_eq!(jobs, Some(8));
                assert_eq!(base_url.as_deref(), Some("https://example.com"));
                assert!(strict);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_minify_command_parsing() {
        let args = ["sitepolish", "minify", "--dry-run"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Minify { dry_run } => assert!(dry_run),
            _ => panic!("Expected Minify command"),
        }
    }

    #[test]
    fn test_cli_sitemap_command_parsing() {
        let args = ["sitepolish", "sitemap", "--base-url", "https://example.org"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Sitemap { base_url } => {
                assert_eq!(base_url.as_deref(), Some("https://example.org"));
            }
            _ => panic!("Expected Sitemap command"),
        }
    }

    #[test]
    fn test_cli_check_command_parsing() {
        let args = ["sitepolish", "check", "--strict"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Check { strict } => assert!(strict),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_verbosity_flags() {
        let args = ["sitepolish", "-vvv", "run"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_cli_custom_config_and_root() {
        let args = ["sitepolish", "--config", "site.toml", "--root", "public", "check"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
        assert_eq!(cli.root, PathBuf::from("public"));
    }
}
