//! Private duplex control channel between the supervisor and one worker.

use std::io;
use std::os::fd::AsFd;
use std::os::unix::net::UnixStream as StdUnixStream;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::errors::{WardenError, WardenResult};
use crate::protocol::{Frame, FRAME_LEN};

/// Factory for per-worker socket pairs.
pub struct ControlChannel;

impl ControlChannel {
    /// Create a connected pair.
    ///
    /// The first half is the supervisor's endpoint. The second half is the
    /// raw worker side, meant to be handed to the worker process and then
    /// dropped in the supervisor.
    pub fn pair() -> WardenResult<(ChannelEndpoint, StdUnixStream)> {
        let (supervisor_side, worker_side) = StdUnixStream::pair()
            .map_err(|e| WardenError::spawn(format!("socketpair: {e}")))?;
        let endpoint = ChannelEndpoint::from_std(supervisor_side)?;
        Ok((endpoint, worker_side))
    }
}

/// One side of a control channel, owned by exactly one party.
#[derive(Debug)]
pub struct ChannelEndpoint {
    stream: UnixStream,
    pending: Vec<u8>,
    outbox: Vec<u8>,
}

impl ChannelEndpoint {
    pub fn from_std(stream: StdUnixStream) -> WardenResult<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream: UnixStream::from_std(stream)?,
            pending: Vec::with_capacity(FRAME_LEN * 2),
            outbox: Vec::with_capacity(FRAME_LEN),
        })
    }

    /// Adopt the channel a supervisor attached to this process's stdin.
    pub fn from_stdin() -> WardenResult<Self> {
        let fd = std::io::stdin().as_fd().try_clone_to_owned()?;
        let stream = StdUnixStream::from(fd);
        stream.local_addr().map_err(|e| {
            WardenError::protocol(format!("stdin is not a control channel socket: {e}"))
        })?;
        Self::from_std(stream)
    }

    /// Send `frame` after anything still queued.
    ///
    /// Cancel-safe: bytes the socket has not taken yet stay queued, so a
    /// send abandoned on a timeout never splits a frame on the wire.
    pub async fn send(&mut self, frame: &Frame) -> WardenResult<()> {
        self.outbox.extend_from_slice(&frame.encode());
        self.flush().await
    }

    /// Write out everything still queued. Cancel-safe like `send`.
    pub async fn flush(&mut self) -> WardenResult<()> {
        while !self.outbox.is_empty() {
            let written = self.stream.write(&self.outbox).await?;
            if written == 0 {
                return Err(io::Error::from(io::ErrorKind::WriteZero).into());
            }
            self.outbox.drain(..written);
        }
        Ok(())
    }

    /// Bytes of abandoned sends that the socket has not taken yet.
    pub fn backlog(&self) -> usize {
        self.outbox.len()
    }

    /// Receive the next frame, `None` once the peer has closed the channel.
    ///
    /// Cancel-safe: bytes of a partially received frame stay buffered and
    /// are completed by the next call.
    pub async fn recv(&mut self) -> WardenResult<Option<Frame>> {
        loop {
            if self.pending.len() >= FRAME_LEN {
                let mut bytes = [0u8; FRAME_LEN];
                bytes.copy_from_slice(&self.pending[..FRAME_LEN]);
                self.pending.drain(..FRAME_LEN);
                return Frame::decode(&bytes).map(Some);
            }

            let mut chunk = [0u8; 64];
            let read = self.stream.read(&mut chunk).await?;
            if read == 0 {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let partial = self.pending.len();
                self.pending.clear();
                return Err(WardenError::protocol(format!(
                    "channel closed inside a frame ({partial} of {FRAME_LEN} bytes)"
                )));
            }
            self.pending.extend_from_slice(&chunk[..read]);
        }
    }
}
