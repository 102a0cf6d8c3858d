//! Plaintext stats dump over raw TCP.
//!
//! Every accepted connection receives one line per live namespace,
//! `<namespace>:<created>:<members>:<connections>\n`, and is then closed.
//! The listener binds to loopback by default.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use meter_core::config::StatsConfig;
use meter_core::AppResult;
use meter_core::error::{AppError, ErrorKind};
use meter_realtime::NamespaceRegistry;

/// Bound stats listener.
#[derive(Debug)]
pub struct StatsListener {
    listener: TcpListener,
    registry: Arc<NamespaceRegistry>,
}

impl StatsListener {
    /// Binds the listener.
    pub async fn bind(
        config: &StatsConfig,
        registry: Arc<NamespaceRegistry>,
    ) -> AppResult<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Io,
                format!("Failed to bind stats listener on {addr}"),
                e,
            )
        })?;
        Ok(Self { listener, registry })
    }

    /// The bound address.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `cancel` flips to `true`.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(addr = %addr, "Stats listener started");
        }

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let dump = render(&self.registry);
                        tokio::spawn(async move {
                            if let Err(e) = write_dump(stream, dump).await {
                                debug!(peer = %peer, error = %e, "Stats dump write failed");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "Stats listener accept failed"),
                },
            }
        }

        info!("Stats listener stopped");
    }
}

/// One `name:created:members:connections` line per live namespace.
pub fn render(registry: &NamespaceRegistry) -> String {
    registry
        .snapshot_all()
        .iter()
        .map(|(name, stats)| {
            format!(
                "{name}:{}:{}:{}\n",
                stats.created.timestamp(),
                stats.members,
                stats.connections
            )
        })
        .collect()
}

async fn write_dump(mut stream: TcpStream, dump: String) -> std::io::Result<()> {
    stream.write_all(dump.as_bytes()).await?;
    stream.shutdown().await
}
