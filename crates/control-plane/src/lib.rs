//! Network control plane: remote clients push worker configurations into a
//! running supervisor.

pub mod client;
pub mod codec;
pub mod server;

pub use client::ControlPlaneClient;
pub use codec::{decode_batch, encode_record, DecodedBatch, RECORD_VERSION};
pub use server::{ControlPlaneServer, MAX_BATCH_BYTES};
