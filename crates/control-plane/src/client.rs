use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, info};
use warden_core::{ControlPlaneSettings, WardenError, WardenResult, WorkerConfig};

use crate::codec::encode_record;

/// Sends worker configurations to a running server and returns.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    default_port: u16,
    connect_timeout: Duration,
}

impl ControlPlaneClient {
    pub fn new(settings: &ControlPlaneSettings) -> Self {
        Self {
            default_port: settings.port,
            connect_timeout: settings.connect_timeout(),
        }
    }

    /// Deliver `configs` to `target` (`host`, `host:port` or `[v6]:port`).
    /// Returns the number of records written.
    pub async fn send(&self, target: &str, configs: &[WorkerConfig]) -> WardenResult<usize> {
        let mut payload = Vec::new();
        for config in configs {
            payload.extend(encode_record(config)?);
        }

        let mut stream = self.connect(target).await?;
        stream
            .write_all(&payload)
            .await
            .map_err(|e| WardenError::network(format!("sending to {target}: {e}")))?;
        stream
            .shutdown()
            .await
            .map_err(|e| WardenError::network(format!("closing connection to {target}: {e}")))?;

        info!("Sent {} configurations to {target}", configs.len());
        Ok(configs.len())
    }

    async fn connect(&self, target: &str) -> WardenResult<TcpStream> {
        let addrs: Vec<SocketAddr> = match split_target(target, self.default_port) {
            Target::Resolved(addr) => vec![addr],
            Target::Host(host, port) => lookup_host((host, port))
                .await
                .map_err(|e| WardenError::network(format!("cannot resolve {host}: {e}")))?
                .collect(),
        };

        let mut last_error = format!("{target} resolved to no addresses");
        for addr in addrs {
            match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    debug!("Connected to {addr}");
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    debug!("Connect to {addr} failed: {e}");
                    last_error = format!("{addr}: {e}");
                }
                Err(_) => {
                    debug!("Connect to {addr} timed out");
                    last_error = format!("{addr}: timed out");
                }
            }
        }
        Err(WardenError::network(format!(
            "could not connect to {target} ({last_error})"
        )))
    }
}

#[derive(Debug, PartialEq)]
enum Target<'a> {
    Resolved(SocketAddr),
    Host(&'a str, u16),
}

fn split_target(target: &str, default_port: u16) -> Target<'_> {
    if let Ok(addr) = target.parse::<SocketAddr>() {
        return Target::Resolved(addr);
    }
    // bare IPv6 literals contain several colons and carry no port
    if let Some((host, port)) = target.rsplit_once(':') {
        if !host.contains(':') {
            if let Ok(port) = port.parse::<u16>() {
                return Target::Host(host, port);
            }
        }
    }
    let host = target.trim_start_matches('[').trim_end_matches(']');
    Target::Host(host, default_port)
}
