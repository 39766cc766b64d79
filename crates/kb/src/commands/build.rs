//! `kb build` command implementation.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use kb_config::{CliSettings, Config};
use kb_site::SiteBuilder;

use crate::commands::report_unresolved_links;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover kb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markdown source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// URL path prefix the site is served under (overrides config).
    #[arg(long)]
    base: Option<String>,

    /// Skip reading git history.
    #[arg(long)]
    no_git: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, the build or writing fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let started = Instant::now();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            out_dir: self.out_dir,
            base: self.base,
            git: self.no_git.then_some(false),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let out_dir = config.build.out_dir.clone();

        output.info(&format!("Source: {}", config.build.source_dir.display()));
        output.info(&format!("Output: {}", out_dir.display()));

        let site = SiteBuilder::new(config).build()?;
        report_unresolved_links(&site, &output);
        let pages = site.write(&out_dir)?;

        output.success(&format!(
            "Built {pages} pages in {:.2?}",
            started.elapsed()
        ));
        Ok(())
    }
}
