use std::time::Duration;

use anyhow::Result;
use arjun_mcp_rs::config::{ServerConfig, MCP_PATH};
use arjun_mcp_rs::server;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// arjun-mcp-rs — MCP tool server exposing the Arjun hidden HTTP parameter scanner.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "arjun-mcp-rs",
    version,
    about = "MCP tool server exposing the Arjun hidden HTTP parameter scanner.",
    long_about = None
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Scanner executable (looked up in PATH unless absolute).
    #[arg(long, env = "ARJUN_BIN", default_value = "arjun")]
    binary: String,

    /// Hard wall-clock limit per scan, in seconds.
    #[arg(long = "timeout-secs", env = "ARJUN_TIMEOUT_SECS", default_value_t = 600)]
    timeout_secs: u64,

    /// Reject unknown methods, negative rate limits and non-positive chunk sizes.
    #[arg(long, env = "ARJUN_STRICT", default_value_t = false)]
    strict: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            path: MCP_PATH.to_string(),
            program: cli.binary,
            timeout: Duration::from_secs(cli.timeout_secs),
            strict: cli.strict,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();

    let config = ServerConfig::from(cli);
    info!(?config, "starting arjun-mcp-rs");

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
        }
        on_signal.cancel();
    });

    server::serve(config, shutdown).await
}
