//! HTTP server for kb knowledge-base sites.
//!
//! Serves a built, frozen [`Site`] over HTTP:
//! - `GET /api/site`: site summary, navigation and routes
//! - `GET /api/pages/{*path}`: JSON bundle of one article
//! - any other `GET`: the article at that routing path as HTML
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kb_config::Config;
//! use kb_server::{ServerConfig, run_server};
//! use kb_site::SiteBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None, None)?;
//!     let server_config = ServerConfig::from_config(&config, "0.1.0");
//!     let site = Arc::new(SiteBuilder::new(config).build()?);
//!
//!     run_server(site, server_config).await?;
//!     Ok(())
//! }
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use kb_site::Site;
use state::AppState;

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Application version (part of every `ETag`).
    pub version: String,
}

impl ServerConfig {
    /// Create server configuration from kb config.
    #[must_use]
    pub fn from_config(config: &kb_config::Config, version: impl Into<String>) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            version: version.into(),
        }
    }

    fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let address = if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };
        address
            .parse()
            .map_err(|e: std::net::AddrParseError| ServerError::InvalidAddress {
                message: e.to_string(),
                address,
            })
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid or the listener fails.
pub async fn run_server(site: Arc<Site>, config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.socket_addr()?;
    let articles = site.registry().len();

    let state = Arc::new(AppState {
        site,
        version: config.version,
    });
    let app = app::create_router(state);

    tracing::info!(address = %addr, articles, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str, port: u16) -> ServerConfig {
        ServerConfig {
            host: host.to_owned(),
            port,
            version: String::new(),
        }
    }

    #[test]
    fn test_socket_addr_ipv4() {
        let addr = config("127.0.0.1", 7878).socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:7878");
    }

    #[test]
    fn test_socket_addr_ipv6() {
        let addr = config("::1", 80).socket_addr().unwrap();
        assert_eq!(addr.to_string(), "[::1]:80");
    }

    #[test]
    fn test_socket_addr_invalid() {
        let err = config("not a host", 80).socket_addr().unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { .. }));
    }

    #[test]
    fn test_from_config() {
        let kb = kb_config::Config::default();
        let server = ServerConfig::from_config(&kb, "1.2.3");
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 7878);
        assert_eq!(server.version, "1.2.3");
    }
}
