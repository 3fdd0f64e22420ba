//! MCP server binary entry point.
//!
//! This binary starts the `research` MCP server on stdio. Protocol messages
//! use stdout, so all logging goes to stderr.
//!
//! # Examples
//!
//! ```bash
//! mcp_server --paper-dir ./papers --log-level debug
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mcp_paper_cache::{
    provider::arxiv::ArxivProvider,
    server::McpServer,
    service::PaperCacheService,
    storage::json::JsonTopicStorage,
    AppConfig,
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// MCP server exposing arXiv search, paper lookup and citations
#[derive(Parser, Debug)]
#[command(name = "mcp_server", version, about)]
struct Args {
    /// Directory holding one folder per searched topic [default: $PAPER_DIR or ./papers]
    #[arg(long, value_name = "DIR")]
    paper_dir: Option<PathBuf>,

    /// arXiv API endpoint [default: $ARXIV_API_URL or the public API]
    #[arg(long, value_name = "URL")]
    arxiv_url: Option<String>,

    /// Logging verbosity level (overridden by RUST_LOG)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging subsystem with the specified level
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let config = AppConfig::from_env()
        .context("Invalid environment configuration")?
        .with_overrides(args.paper_dir, args.arxiv_url);
    debug!("Configuration: {:?}", config);

    let provider =
        ArxivProvider::new(config.arxiv.clone()).context("Failed to create arXiv client")?;
    let storage = JsonTopicStorage::new(config.paper_dir.clone());
    let service = PaperCacheService::new(provider, storage);

    info!(
        "Starting MCP server '{}' v{} (cache: {})",
        config.server.name,
        config.server.version,
        config.paper_dir.display()
    );

    let server = McpServer::new(config.server, service);
    server.run().await.context("MCP server stopped with an error")?;

    Ok(())
}
