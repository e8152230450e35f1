mod logging;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stowage_server::connection::{serve, ProviderTable};
use stowage_server::{Provider, ProviderConfig};
use tokio_util::sync::CancellationToken;

/// Runs one storage provider, serving the stowage wire protocol on a TCP
/// listener and Prometheus metrics on a separate port.
#[derive(Debug, Parser)]
#[command(about, version)]
struct Cli {
    /// Path to the provider's JSON configuration (database + buffer cache).
    #[arg(long, env = "CONFIG_FILE")]
    config: PathBuf,

    /// The 16-bit id clients address this provider by.
    #[arg(long, env = "PROVIDER_ID", default_value = "1")]
    provider_id: u16,

    /// Address to accept client connections on.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:9100")]
    listen_addr: SocketAddr,

    /// Address to serve the `/metrics` Prometheus endpoint on.
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:9101")]
    metrics_addr: SocketAddr,

    /// Maximum number of concurrent client connections.
    #[arg(long, env = "MAX_CONNECTIONS", default_value = "300")]
    max_connections: usize,

    /// Default tracing filter directive, overridden by `RUST_LOG` if set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::install(&cli.log_level);

    tracing::info!(provider_id = cli.provider_id, config = %cli.config.display(), "starting stowage provider");

    let config = ProviderConfig::from_file(&cli.config)
        .map_err(|status| anyhow::anyhow!("failed to load provider configuration: {status}"))?;
    let provider = Arc::new(
        Provider::new(cli.provider_id, &config)
            .map_err(|status| anyhow::anyhow!("failed to construct provider: {status}"))?,
    );
    let providers = Arc::new(ProviderTable::new([provider]));

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
        tracing::info!("received ctrl-c, shutting down");
        ctrl_c_token.cancel();
    });

    let connection_limit = Arc::new(tokio::sync::Semaphore::new(cli.max_connections));

    let metrics_router = stowage_server::metrics::build_router();
    let metrics_task = axum_server::bind(cli.metrics_addr).serve(metrics_router.into_make_service());
    tokio::spawn(async move {
        if let Err(error) = metrics_task.await {
            tracing::error!(%error, "metrics server exited");
        }
    });

    let listener = tokio::net::TcpListener::bind(cli.listen_addr)
        .await
        .context("failed to bind listen address")?;
    tracing::info!(addr = %cli.listen_addr, "listening for connections");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(error) => {
                        tracing::warn!(%error, "failed to accept connection");
                        continue;
                    }
                };
                let _ = socket.set_nodelay(true);

                // A child token: cancelling the process-wide token stops every
                // open connection's request loop, but a connection never
                // cancels its siblings.
                tokio::spawn(serve(
                    providers.clone(),
                    socket,
                    peer,
                    cancel_token.child_token(),
                    connection_limit.clone(),
                ));
            }
            _ = cancel_token.cancelled() => {
                tracing::info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }

    Ok(())
}
