use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};
use warden_core::{
    ConfigInbox, Logbook, QuitSignal, SupervisorSettings, WardenResult, WorkerId,
};

use crate::prompt::OperatorPrompt;
use crate::record::ExitOutcome;
use crate::supervisor::WorkerSupervisor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ShutdownRequested,
    Terminated,
}

/// What the loop observed when it shut its workers down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub ticks: u64,
    pub outcomes: Vec<(WorkerId, ExitOutcome)>,
}

/// Drives the supervisor on a fixed cadence: spawn, accept remote
/// configurations, poll, then act on a pending quit request.
pub struct SchedulerLoop {
    supervisor: WorkerSupervisor,
    inbox: Option<Box<dyn ConfigInbox>>,
    prompt: Box<dyn OperatorPrompt>,
    quit: QuitSignal,
    master_log: Logbook,
    tick_interval: Duration,
    confirm_quit: bool,
    state: LoopState,
    ticks: u64,
    outcomes: Vec<(WorkerId, ExitOutcome)>,
}

impl SchedulerLoop {
    pub fn new(
        supervisor: WorkerSupervisor,
        master_log: Logbook,
        quit: QuitSignal,
        prompt: Box<dyn OperatorPrompt>,
        settings: &SupervisorSettings,
    ) -> Self {
        Self {
            supervisor,
            inbox: None,
            prompt,
            quit,
            master_log,
            tick_interval: settings.tick_interval(),
            confirm_quit: settings.confirm_quit,
            state: LoopState::Running,
            ticks: 0,
            outcomes: Vec::new(),
        }
    }

    /// Accept worker configurations from a remote source every tick.
    pub fn with_inbox(mut self, inbox: Box<dyn ConfigInbox>) -> Self {
        self.inbox = Some(inbox);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn supervisor(&self) -> &WorkerSupervisor {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut WorkerSupervisor {
        &mut self.supervisor
    }

    /// Tick until a quit is confirmed. The first tick runs immediately,
    /// later ones on absolute multiples of the tick interval.
    pub async fn run(mut self) -> WardenResult<ShutdownReport> {
        info!(
            "Scheduler started: capacity {}, tick {} ms",
            self.supervisor.capacity(),
            self.tick_interval.as_millis()
        );
        let mut ticker = interval_at(Instant::now(), self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let quit = self.quit.clone();

        while self.state != LoopState::Terminated {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = quit.notified() => {}
            }

            if let Err(e) = self.tick().await {
                self.log(format!("Fatal error: {e}"));
                let outcomes = self.supervisor.terminate_all().await;
                self.log_outcomes(&outcomes);
                return Err(e);
            }
        }

        Ok(ShutdownReport {
            ticks: self.ticks,
            outcomes: std::mem::take(&mut self.outcomes),
        })
    }

    /// One scheduling step. Only spawn failures are returned; everything
    /// else is logged and the step continues.
    pub async fn tick(&mut self) -> WardenResult<()> {
        self.ticks += 1;

        if let Some(id) = self.supervisor.spawn_next()? {
            let event = match self.supervisor.record(id) {
                Some(record) => format!(
                    "Started {id} (pid {}): {}",
                    record.pid().unwrap_or_default(),
                    record.config()
                ),
                None => format!("Started {id}"),
            };
            self.log(event);
        }

        self.service_inbox();

        let statuses = self.supervisor.poll_all().await;
        for (id, status) in statuses {
            let pid = self
                .supervisor
                .record(id)
                .and_then(|r| r.pid())
                .unwrap_or_default();
            if !status.is_healthy() {
                warn!("{id} (pid {pid}) is not healthy: {status}");
            }
            self.log(format!("{id} (pid {pid}) status: {status}"));
        }

        if self.quit.is_raised() {
            self.handle_quit().await;
        }
        Ok(())
    }

    fn service_inbox(&mut self) {
        let Some(inbox) = self.inbox.as_mut() else {
            return;
        };
        let accepted = inbox.poll_accept();
        let batches = inbox.drain_batches();

        if let Some(peer) = accepted {
            self.log(format!("Received command from: {}", peer.ip()));
        }
        for batch in batches {
            for config in batch.configs {
                let description = config.to_string();
                match self.supervisor.register(config) {
                    Ok(id) => {
                        self.log(format!("Registered {id} from {}: {description}", batch.peer))
                    }
                    Err(e) => {
                        warn!("Rejected configuration from {}: {e}", batch.peer);
                        self.log(format!("Rejected {description}: {e}"));
                    }
                }
            }
            if batch.rejected > 0 {
                self.log(format!(
                    "Dropped {} malformed records from {}",
                    batch.rejected, batch.peer
                ));
            }
        }
    }

    async fn handle_quit(&mut self) {
        self.state = LoopState::ShutdownRequested;
        let confirmed = !self.confirm_quit || self.prompt.confirm_quit().await;

        if confirmed {
            self.log("Shutdown confirmed, terminating workers");
            let outcomes = self.supervisor.terminate_all().await;
            self.log_outcomes(&outcomes);
            self.outcomes = outcomes;
            self.state = LoopState::Terminated;
        } else {
            self.log("Shutdown cancelled");
            self.quit.clear();
            self.state = LoopState::Running;
        }
    }

    fn log_outcomes(&mut self, outcomes: &[(WorkerId, ExitOutcome)]) {
        for (id, outcome) in outcomes {
            self.log(format!("{id} {outcome}"));
        }
    }

    fn log(&mut self, event: impl AsRef<str>) {
        let event = event.as_ref();
        info!("{event}");
        if let Err(e) = self.master_log.record(event) {
            warn!("Master log {} not written: {e}", self.master_log.path().display());
        }
    }
}
