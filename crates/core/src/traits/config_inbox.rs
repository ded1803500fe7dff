use std::net::SocketAddr;

use crate::models::WorkerConfig;

/// Configurations received over one network connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedBatch {
    pub peer: SocketAddr,
    pub configs: Vec<WorkerConfig>,
    /// Records dropped while decoding.
    pub rejected: usize,
}

/// Remote source of worker configurations, serviced once per scheduler tick.
///
/// Neither method may block the tick.
pub trait ConfigInbox {
    /// Accept at most one pending connection. Returns the peer if one was
    /// accepted.
    fn poll_accept(&mut self) -> Option<SocketAddr>;

    /// Batches whose connection has been read to the end since the last call.
    fn drain_batches(&mut self) -> Vec<ReceivedBatch>;
}
