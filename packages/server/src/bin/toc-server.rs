//! TOC HTTP Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (port 8000, default DB path)
//! cargo run --bin toc-server
//!
//! # Custom port and database
//! TOC_SERVER_PORT=9000 TOC_DATABASE_PATH=/tmp/toc.db cargo run --bin toc-server
//! ```
//!
//! # Environment Variables
//!
//! See [`toc_server::ServerConfig`] for the full list; `RUST_LOG` sets the
//! logging filter (default: info).

use toc_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("TOC HTTP Server");

    let config = ServerConfig::from_env()?;
    tracing::info!(
        "Port: {}, import mode: {}, dotted parents: {}",
        config.port,
        config.import_mode,
        config.infer_dotted_parents
    );

    start_server(config).await
}
