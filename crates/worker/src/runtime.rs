use std::time::Duration;

use anyhow::Context;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use warden_core::{
    ChannelEndpoint, ControlMessage, Frame, Logbook, WardenError, WardenResult, WorkerConfig,
    WorkerStatus,
};

use crate::sensor::{Sensor, SimulatedSensor};

/// How the measurement loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Terminated,
    ChannelClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub measurements: u64,
    pub final_status: WorkerStatus,
}

enum Event {
    Tick,
    Frame(WardenResult<Option<Frame>>),
}

/// The measurement loop running inside a worker process.
pub struct WorkerRuntime<S: Sensor> {
    config: WorkerConfig,
    sensor: S,
    channel: ChannelEndpoint,
    log: Option<Logbook>,
    tick: Duration,
    counter: u32,
    measurements: u64,
    status: WorkerStatus,
}

impl<S: Sensor> WorkerRuntime<S> {
    /// Without a `log` the measurement log is opened on the first
    /// measurement, and again on every later one until that succeeds.
    pub fn new(
        config: WorkerConfig,
        sensor: S,
        channel: ChannelEndpoint,
        log: Option<Logbook>,
        tick: Duration,
    ) -> Self {
        Self {
            config,
            sensor,
            channel,
            log,
            tick,
            counter: 0,
            measurements: 0,
            status: WorkerStatus::Starting,
        }
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
    }

    /// Run until the supervisor sends `Terminate` or closes the channel.
    /// The sensor and log are released when this returns.
    pub async fn run(mut self) -> WardenResult<RunSummary> {
        info!(
            "Worker started: {} (pid {})",
            self.config,
            std::process::id()
        );
        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let reason = loop {
            let event = tokio::select! {
                _ = ticker.tick() => Event::Tick,
                frame = self.channel.recv() => Event::Frame(frame),
            };

            match event {
                Event::Tick => self.on_tick(),
                Event::Frame(Ok(Some(Frame::Command { seq, message }))) => match message {
                    ControlMessage::StatusRequest => {
                        debug!("Status request {seq}, answering {}", self.status);
                        if let Err(e) = self.channel.send(&Frame::reply(seq, self.status)).await {
                            warn!("Status reply failed: {e}");
                            break StopReason::ChannelClosed;
                        }
                    }
                    ControlMessage::Terminate => break StopReason::Terminated,
                },
                Event::Frame(Ok(Some(frame @ Frame::StatusReply { .. }))) => {
                    warn!("Ignoring unexpected frame from supervisor: {frame:?}");
                }
                Event::Frame(Ok(None)) => break StopReason::ChannelClosed,
                Event::Frame(Err(WardenError::Protocol(e))) => {
                    warn!("Discarding malformed control frame: {e}");
                }
                Event::Frame(Err(e)) => return Err(e),
            }
        };

        info!(
            "Worker stopping ({reason:?}) after {} measurements",
            self.measurements
        );
        Ok(RunSummary {
            reason,
            measurements: self.measurements,
            final_status: self.status,
        })
    }

    fn on_tick(&mut self) {
        self.counter += 1;
        if self.counter < self.config.interval() {
            return;
        }
        self.counter = 0;
        self.measure();
    }

    fn measure(&mut self) {
        let reading = match self.sensor.read() {
            Ok(reading) => reading,
            Err(e) => {
                self.status = WorkerStatus::Error;
                warn!("Measurement failed: {e}");
                return;
            }
        };

        match self.logbook().and_then(|log| log.record(reading.to_string())) {
            Ok(line) => {
                self.status = WorkerStatus::Running;
                self.measurements += 1;
                if self.config.echo() {
                    println!("{line}");
                }
            }
            Err(e) => {
                self.status = WorkerStatus::Error;
                self.log = None;
                warn!(
                    "Measurement not logged to {}: {e}",
                    self.config.log_path().display()
                );
            }
        }
    }

    fn logbook(&mut self) -> WardenResult<&mut Logbook> {
        let log = match self.log.take() {
            Some(log) => log,
            None => Logbook::open(self.config.log_path())?,
        };
        Ok(self.log.insert(log))
    }
}

/// Entry point of a worker process: adopt the control channel on stdin,
/// open the measurement log and run until told to stop.
pub async fn run_worker(config: WorkerConfig, tick: Duration) -> anyhow::Result<RunSummary> {
    let channel = ChannelEndpoint::from_stdin().context("control channel unavailable")?;
    let log = match Logbook::open(config.log_path()) {
        Ok(log) => Some(log),
        Err(e) => {
            warn!("Measurement log unavailable, retrying on each measurement: {e}");
            None
        }
    };
    let sensor = SimulatedSensor::new(config.kind(), config.address());
    let summary = WorkerRuntime::new(config, sensor, channel, log, tick)
        .run()
        .await?;
    Ok(summary)
}
