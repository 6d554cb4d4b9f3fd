//! Listener wiring: accept connections and hand each one to a session.

use std::{net::SocketAddr, time::Duration};

use anyhow::{bail, Result};
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::{hub, session};

/// Inactivity window applied both during identification and active chat.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub fn new(listener: TcpListener) -> Self {
        Self::with_config(listener, ServerConfig::default())
    }

    pub fn with_config(listener: TcpListener, config: ServerConfig) -> Self {
        Self { listener, config }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the hub and the accept loop.
    ///
    /// Per-connection failures stay inside their session; accept errors are
    /// logged and skipped. The hub task exiting is the one fault that stops
    /// the server.
    pub async fn run(self) -> Result<()> {
        let Server { listener, config } = self;
        let (handle, hub) = hub::channel();
        let mut hub_task = tokio::spawn(hub.run());

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted connection");
                        tokio::spawn(session::run(stream, handle.clone(), config.idle_timeout));
                    }
                    Err(error) => warn!(?error, "failed to accept connection"),
                },
                result = &mut hub_task => {
                    bail!("broadcast hub terminated unexpectedly: {result:?}");
                }
            }
        }
    }
}
