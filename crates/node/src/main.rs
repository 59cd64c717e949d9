//! Command line entry point for running a threshold ECDSA coordinator
//! node: loads configuration, binds the peer-to-peer transport, and
//! serves the RPC surface.
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tss_node::{Node, NodeConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the node's TOML configuration file.
    #[clap(short, long, default_value = "tss-node.toml")]
    config: PathBuf,
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = NodeConfig::load(&args.config).await?;

    let node = Arc::new(Node::new(config).await?);
    node.announce().await?;

    let router = tss_node::rpc::router(node.clone());
    let http_addr = node.config().http.bind_addr;
    let listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!(%http_addr, "rpc server listening");

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "network loop exited");
            }
        }
        result = axum::serve(listener, router) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "rpc server exited");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down on ctrl-c");
            node.disconnect().await;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tss_node=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
    }

    Ok(())
}
