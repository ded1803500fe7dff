//! Worker process side: the measurement loop and its sensors.

pub mod runtime;
pub mod sensor;

pub use runtime::{run_worker, RunSummary, StopReason, WorkerRuntime};
pub use sensor::{Reading, Sensor, SensorError, SimulatedSensor};
