use std::sync::Arc;

use ac_blockchain::DEFAULT_DIFFICULTY;
use ac_node::{api, logging, AppState, NodeConfig};
use ac_peer::HttpTransport;
use clap::Parser;
use tracing::info;

/// AuditChain node daemon.
#[derive(Parser, Debug)]
#[command(
    name = "ac-node",
    version,
    about = "AuditChain P2P node",
    long_about = "Runs an AuditChain node: accepts transactions, mines \
                  Merkle-committed blocks, keeps consensus with its peers \
                  and answers Merkle-proof audits."
)]
struct Cli {
    /// TCP port to listen on.
    port: u16,

    /// Interface to bind. Use 0.0.0.0 to accept non-local peers.
    #[arg(long, default_value = "127.0.0.1", env = "AC_HOST")]
    host: String,

    /// Leading zero characters required of every mined block hash.
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY, env = "AC_DIFFICULTY")]
    difficulty: usize,

    /// Suppress log output to stderr (run silently).
    #[arg(short, long, default_value_t = false, env = "AC_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.quiet);

    let config = NodeConfig {
        host: cli.host,
        port: cli.port,
        difficulty: cli.difficulty,
        quiet: cli.quiet,
    };

    info!(
        port = config.port,
        host = %config.host,
        difficulty = config.difficulty,
        "Starting AuditChain node"
    );

    let state = AppState::new(config.difficulty, Arc::new(HttpTransport::new()));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Node stopped");
    Ok(())
}

/// Resolves when the process receives Ctrl-C, letting in-flight requests
/// finish before the server exits.
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "could not install the Ctrl-C handler");
    }
}
