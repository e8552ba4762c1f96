//! adgraph-mcp - Facebook Ads tool server over stdio.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fbgraph::GraphClient;
use switchboard::ToolRegistry;
use tracing::info;
use tracing_subscriber::EnvFilter;

use adgraph_mcp::{config, meta, scopes::ScopeManager};

#[derive(Debug, Parser)]
#[command(name = config::SERVER_NAME, version, about = "Facebook Ads MCP tool server")]
struct Cli {
    /// Override the Graph API host (testing).
    #[arg(long)]
    graph_host: Option<String>,

    /// Override the video upload host (testing).
    #[arg(long)]
    video_host: Option<String>,

    /// Override the Graph API version tag (testing).
    #[arg(long)]
    api_version: Option<String>,

    /// Log level filter when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol; all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut client = GraphClient::from_env()
        .with_context(|| format!("set {} to a valid access token", fbgraph::ACCESS_TOKEN_ENV))?;
    if let Some(host) = cli.graph_host {
        client = client.with_host(host);
    }
    if let Some(host) = cli.video_host {
        client = client.with_video_host(host);
    }
    if let Some(version) = cli.api_version {
        client = client.with_version(version);
    }
    let client = Arc::new(client);

    let registry = Arc::new(ToolRegistry::new());
    let manager = Arc::new(ScopeManager::new(
        Arc::clone(&registry),
        Arc::clone(&client),
    ));
    meta::register_all(&registry, &manager, &client);

    let scopes = config::initial_scopes();
    manager
        .set(&scopes)
        .await
        .with_context(|| format!("loading initial scopes {:?}", scopes))?;

    info!(
        scopes = %scopes.join(","),
        tools = registry.len(),
        version = %client.version(),
        "adgraph-mcp ready"
    );

    switchboard::stdio::serve(registry, config::SERVER_NAME, env!("CARGO_PKG_VERSION"))
        .await
        .context("stdio transport failed")?;
    Ok(())
}
