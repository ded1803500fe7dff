pub mod channel;
pub mod config;
pub mod errors;
pub mod logbook;
pub mod models;
pub mod protocol;
pub mod quit;
pub mod traits;

pub use channel::{ChannelEndpoint, ControlChannel};
pub use config::*;
pub use errors::*;
pub use logbook::Logbook;
pub use models::{
    parse_sensor_address, SensorKind, WorkerConfig, WorkerId, WorkerStatus,
    DEFAULT_MEASUREMENT_LOG,
};
pub use protocol::{ControlMessage, Frame, FRAME_LEN, PROTOCOL_VERSION};
pub use quit::QuitSignal;
pub use traits::{ConfigInbox, ReceivedBatch};
