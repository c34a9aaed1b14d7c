use anyhow::{Result, bail};
use clap::Parser;
use socks5_proxy::{ProxyConfig, Socks5Server, UserPass};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "A lightweight SOCKS5 proxy", long_about = None)]
struct Args {
    /// Listen IP address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Listen port
    #[arg(long, default_value_t = 1080)]
    port: u16,

    /// Username for SOCKS5 proxy
    #[arg(short, long)]
    username: Option<String>,

    /// Password for SOCKS5 proxy
    #[arg(short, long)]
    password: Option<String>,

    /// Seconds a client gets to finish auth and request
    #[arg(long)]
    handshake_timeout: Option<u64>,

    /// Seconds allowed for dialing the target
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args
    let args = Args::parse();

    // Initialize tracing subscriber
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    // Check for auth and grab it if present
    let auth = match (args.username, args.password) {
        (Some(u), Some(p)) => {
            info!("Authentication enabled");
            Some(UserPass::new(u, p))
        }
        (None, None) => None,
        _ => bail!("must provide both username and password (or neither)"),
    };

    let config = ProxyConfig::new(args.host, args.port)
        .with_auth(auth)
        .with_handshake_timeout(args.handshake_timeout.map(Duration::from_secs))
        .with_connect_timeout(args.connect_timeout.map(Duration::from_secs));

    // Bind up front so a bad address fails startup
    let mut server = Socks5Server::new(config);
    server.bind().await?;

    tokio::select! {
        res = server.run() => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}
