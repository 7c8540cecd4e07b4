//! Serves the in-memory reference implementation of the partial-receiving
//! endpoint, seeded with one demo shipment (`demo-shipment`).

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use receiving_client::mock;

#[derive(Parser)]
#[command(
    name = "receiving-mock-server",
    about = "In-memory reference server for the partial receiving API",
    version
)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0", help = "Address to bind")]
    host: String,
    #[arg(long, default_value_t = 8081, help = "Port to listen on")]
    port: u16,
    #[arg(long, help = "Start with no shipments instead of the demo seed")]
    empty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let state = if cli.empty {
        mock::MockReceivingState::empty()
    } else {
        mock::MockReceivingState::seeded().await
    };
    let app = mock::router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, seeded = !cli.empty, "receiving mock server listening");

    axum::serve(listener, app)
        .await
        .context("server terminated")?;
    Ok(())
}
