//! Supervisor ↔ worker control protocol.
//!
//! Every frame is exactly [`FRAME_LEN`] bytes:
//!
//! ```text
//! +---------+------+--------+----------+----------------------+
//! | version | kind | status | reserved | sequence (u32, BE)   |
//! +---------+------+--------+----------+----------------------+
//! ```
//!
//! The supervisor sends `StatusRequest` and `Terminate`; a worker only ever
//! sends `StatusReply`, echoing the sequence number of the request it answers.

use crate::errors::{WardenError, WardenResult};
use crate::models::WorkerStatus;

pub const PROTOCOL_VERSION: u8 = 1;
pub const FRAME_LEN: usize = 8;

const KIND_STATUS_REQUEST: u8 = 0x01;
const KIND_TERMINATE: u8 = 0x04;
const KIND_STATUS_REPLY: u8 = 0x81;

/// Message the supervisor sends to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    StatusRequest,
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Command { seq: u32, message: ControlMessage },
    StatusReply { seq: u32, status: WorkerStatus },
}

impl Frame {
    pub fn command(seq: u32, message: ControlMessage) -> Self {
        Frame::Command { seq, message }
    }

    pub fn reply(seq: u32, status: WorkerStatus) -> Self {
        Frame::StatusReply { seq, status }
    }

    pub fn seq(&self) -> u32 {
        match self {
            Frame::Command { seq, .. } | Frame::StatusReply { seq, .. } => *seq,
        }
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let (kind, status, seq) = match *self {
            Frame::Command { seq, message } => {
                let kind = match message {
                    ControlMessage::StatusRequest => KIND_STATUS_REQUEST,
                    ControlMessage::Terminate => KIND_TERMINATE,
                };
                (kind, 0, seq)
            }
            Frame::StatusReply { seq, status } => (KIND_STATUS_REPLY, status.code(), seq),
        };

        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = PROTOCOL_VERSION;
        bytes[1] = kind;
        bytes[2] = status;
        bytes[4..].copy_from_slice(&seq.to_be_bytes());
        bytes
    }

    pub fn decode(bytes: &[u8; FRAME_LEN]) -> WardenResult<Self> {
        if bytes[0] != PROTOCOL_VERSION {
            return Err(WardenError::protocol(format!(
                "unsupported control protocol version {}",
                bytes[0]
            )));
        }

        let seq = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        match bytes[1] {
            KIND_STATUS_REQUEST => Ok(Frame::command(seq, ControlMessage::StatusRequest)),
            KIND_TERMINATE => Ok(Frame::command(seq, ControlMessage::Terminate)),
            KIND_STATUS_REPLY => Ok(Frame::reply(seq, WorkerStatus::from_code(bytes[2]))),
            other => Err(WardenError::protocol(format!(
                "unknown control frame kind 0x{other:02X}"
            ))),
        }
    }
}
