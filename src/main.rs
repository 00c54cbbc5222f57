use std::time::Duration;

use clap::Parser;
use duel_client::{ClientConfig, client};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Connect as this user on startup
    #[arg(short, long)]
    username: Option<String>,

    /// WebSocket base URL of the duel server
    #[arg(short, long)]
    server: Option<String>,

    /// Base URL of the code execution service
    #[arg(short, long)]
    judge: Option<String>,

    /// Judge request timeout in seconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env();
    if let Some(server) = args.server {
        config.server_url = server;
    }
    if let Some(judge) = args.judge {
        config.judge_url = judge;
    }
    if let Some(secs) = args.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }

    if let Err(e) = client::run(config, args.username).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
