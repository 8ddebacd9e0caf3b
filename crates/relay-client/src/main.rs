//! Chat relay terminal client
//!
//! Run with:
//! ```bash
//! cargo run -p relay-client -- --name alice --password secret
//! ```
//!
//! Lines typed on stdin are sent to the room; relayed messages are printed
//! to stdout. Logs go to stderr (`RUST_LOG`, default `warn`).

use anyhow::Context;
use clap::Parser;
use relay_client::RelayClient;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Terminal client for the chat relay
#[derive(Debug, Parser)]
#[command(name = "relay-client", about = "Terminal client for the chat relay")]
struct Cli {
    /// Relay host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Relay port
    #[arg(short, long, default_value_t = 50051)]
    port: u16,

    /// Username for the chatroom
    #[arg(short, long)]
    name: String,

    /// Password; an unknown name is registered with it
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(cli).await {
        error!(error = ?e, "Client failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = RelayClient::new(&cli.host, cli.port);
    info!(server = %client.base_url(), username = %cli.name, "Connecting to relay");

    let token = client
        .log_in(&cli.name, &cli.password)
        .await
        .context("log-in failed")?;

    println!("Hello, {}! Welcome to the chatroom!", cli.name);
    println!("Type a message and press enter to send it.");

    let end = client
        .chat(&token, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("chat stream failed")?;

    println!("Chat ended: {end}");
    Ok(())
}
