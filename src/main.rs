use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use chat_relay::{
    cli::Cli,
    server::{Server, ServerConfig},
};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let listener = TcpListener::bind(cli.listen).await?;
    let config = ServerConfig {
        idle_timeout: Duration::from_secs(cli.idle_timeout_secs),
    };
    let server = Server::with_config(listener, config);
    info!("listening on {}", server.local_addr()?);
    server.run().await
}
