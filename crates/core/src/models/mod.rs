pub mod worker;
pub mod worker_config;

pub use worker::{WorkerId, WorkerStatus};
pub use worker_config::{parse_sensor_address, SensorKind, WorkerConfig, DEFAULT_MEASUREMENT_LOG};
