//! `kb serve` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use kb_config::{CliSettings, Config};
use kb_server::{ServerConfig, run_server};
use kb_site::SiteBuilder;

use crate::commands::report_unresolved_links;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover kb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markdown source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Skip reading git history.
    #[arg(long)]
    no_git: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// The site is built before the runtime starts and served until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or the build fails, or the server
    /// fails to start.
    pub(crate) fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            source_dir: self.source_dir,
            git: self.no_git.then_some(false),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let server_config = ServerConfig::from_config(&config, version);

        output.info(&format!(
            "Source directory: {}",
            config.build.source_dir.display()
        ));
        let site = SiteBuilder::new(config).build()?;
        report_unresolved_links(&site, &output);
        output.info(&format!(
            "Starting server on {}:{} ({} articles)",
            server_config.host,
            server_config.port,
            site.registry().len()
        ));

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(run_server(Arc::new(site), server_config))?;
        Ok(())
    }
}
