use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use futures::FutureExt;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use warden_core::{
    ConfigInbox, ControlPlaneSettings, ReceivedBatch, WardenError, WardenResult,
};

use crate::codec::decode_batch;

/// Upper bound on what one connection may deliver.
pub const MAX_BATCH_BYTES: u64 = 1 << 20;

/// Listens for remote worker configurations.
///
/// Connections are accepted one per tick; each is read to EOF by its own
/// task and the decoded batch is handed back through [`ConfigInbox::drain_batches`].
pub struct ControlPlaneServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    receive_timeout: Duration,
    batch_tx: mpsc::UnboundedSender<ReceivedBatch>,
    batch_rx: mpsc::UnboundedReceiver<ReceivedBatch>,
}

impl ControlPlaneServer {
    /// Bind the explicit address if configured, otherwise `[::]` with a
    /// fallback to `0.0.0.0` on hosts without IPv6.
    pub async fn bind(settings: &ControlPlaneSettings) -> WardenResult<Self> {
        let candidates: Vec<IpAddr> = match settings.bind_address {
            Some(addr) => vec![addr],
            None => vec![
                IpAddr::V6(Ipv6Addr::UNSPECIFIED),
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ],
        };

        let mut last_error = None;
        for ip in candidates {
            let addr = SocketAddr::new(ip, settings.port);
            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    let local_addr = listener.local_addr()?;
                    info!("Control plane listening on {local_addr}");
                    let (batch_tx, batch_rx) = mpsc::unbounded_channel();
                    return Ok(Self {
                        listener,
                        local_addr,
                        receive_timeout: settings.receive_timeout(),
                        batch_tx,
                        batch_rx,
                    });
                }
                Err(e) => {
                    debug!("Bind to {addr} failed: {e}");
                    last_error = Some(format!("{addr}: {e}"));
                }
            }
        }

        Err(WardenError::network(format!(
            "cannot listen on port {}: {}",
            settings.port,
            last_error.unwrap_or_else(|| "no address to bind".to_string())
        )))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl ConfigInbox for ControlPlaneServer {
    fn poll_accept(&mut self) -> Option<SocketAddr> {
        match self.listener.accept().now_or_never() {
            None => None,
            Some(Ok((stream, peer))) => {
                info!("Received command from: {}", peer.ip());
                let batch_tx = self.batch_tx.clone();
                let receive_timeout = self.receive_timeout;
                tokio::spawn(async move {
                    let batch = receive_batch(stream, peer, receive_timeout).await;
                    if batch_tx.send(batch).is_err() {
                        debug!("Control plane closed before batch from {peer} was delivered");
                    }
                });
                Some(peer)
            }
            Some(Err(e)) => {
                warn!("Accept failed: {e}");
                None
            }
        }
    }

    fn drain_batches(&mut self) -> Vec<ReceivedBatch> {
        let mut batches = Vec::new();
        while let Ok(batch) = self.batch_rx.try_recv() {
            batches.push(batch);
        }
        batches
    }
}

async fn receive_batch(stream: TcpStream, peer: SocketAddr, timeout: Duration) -> ReceivedBatch {
    let mut bytes = Vec::new();
    let mut limited = stream.take(MAX_BATCH_BYTES);
    match tokio::time::timeout(timeout, limited.read_to_end(&mut bytes)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("Reading from {peer} failed: {e}"),
        Err(_) => warn!(
            "Sender {peer} did not finish within {} ms, using what arrived",
            timeout.as_millis()
        ),
    }

    let decoded = decode_batch(&bytes);
    for rejection in &decoded.rejected {
        warn!("Dropping record from {peer}: {rejection}");
    }
    if let Some(reason) = &decoded.halted {
        warn!("Stopped decoding input from {peer}: {reason}");
    }
    debug!(
        "Connection from {peer} delivered {} bytes, {} configurations",
        bytes.len(),
        decoded.configs.len()
    );

    ReceivedBatch {
        peer,
        configs: decoded.configs,
        rejected: decoded.rejected.len(),
    }
}
