use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use warden_core::{
    ChannelEndpoint, ControlChannel, ControlMessage, Frame, WardenError, WardenResult,
    WorkerConfig, WorkerId, WorkerStatus,
};

use crate::launcher::WorkerLauncher;
use crate::record::{ExitOutcome, WorkerRecord};

/// Owns every worker: configurations waiting to start and running processes.
pub struct WorkerSupervisor {
    launcher: Box<dyn WorkerLauncher>,
    capacity: usize,
    poll_timeout: Duration,
    next_id: u32,
    next_seq: u32,
    pending: VecDeque<(WorkerId, WorkerConfig)>,
    running: BTreeMap<WorkerId, WorkerRecord>,
}

impl WorkerSupervisor {
    pub fn new(
        launcher: Box<dyn WorkerLauncher>,
        capacity: usize,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            launcher,
            capacity,
            poll_timeout,
            next_id: 0,
            next_seq: 0,
            pending: VecDeque::with_capacity(capacity),
            running: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn configured_count(&self) -> usize {
        self.pending.len() + self.running.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &WorkerRecord> {
        self.running.values()
    }

    pub fn record(&self, id: WorkerId) -> Option<&WorkerRecord> {
        self.running.get(&id)
    }

    /// Queue a configuration for spawning. Rejected without side effects
    /// once the table is full.
    pub fn register(&mut self, config: WorkerConfig) -> WardenResult<WorkerId> {
        if self.configured_count() >= self.capacity {
            return Err(WardenError::Capacity {
                capacity: self.capacity,
            });
        }
        self.next_id += 1;
        let id = WorkerId::new(self.next_id);
        debug!("Registered {id}: {config}");
        self.pending.push_back((id, config));
        Ok(id)
    }

    /// Start the oldest pending worker, if any. At most one per call.
    pub fn spawn_next(&mut self) -> WardenResult<Option<WorkerId>> {
        let Some((id, config)) = self.pending.pop_front() else {
            return Ok(None);
        };

        let (channel, worker_side) = match ControlChannel::pair() {
            Ok(pair) => pair,
            Err(e) => {
                self.pending.push_front((id, config));
                return Err(e);
            }
        };
        // the launcher consumes and closes our copy of the worker's end
        let child = match self.launcher.launch(&config, worker_side) {
            Ok(child) => child,
            Err(e) => {
                self.pending.push_front((id, config));
                return Err(e);
            }
        };

        let pid = child.id();
        info!("Spawned {id} (pid {pid:?}): {config}");
        self.running.insert(
            id,
            WorkerRecord {
                id,
                config,
                pid,
                child,
                channel,
                status: WorkerStatus::Starting,
            },
        );
        Ok(Some(id))
    }

    /// Ask every running worker for its status.
    ///
    /// Every worker is asked and waited on concurrently, all under one
    /// deadline for the round. A worker that misses it, including one that
    /// has stopped reading its channel, reports `Unknown`.
    pub async fn poll_all(&mut self) -> BTreeMap<WorkerId, WorkerStatus> {
        self.next_seq = self.next_seq.wrapping_add(1);
        let seq = self.next_seq;
        let deadline = Instant::now() + self.poll_timeout;

        let exchanges = self.running.iter_mut().map(|(id, record)| async move {
            let status = exchange_status(&mut record.channel, *id, seq, deadline).await;
            record.status = status;
            (*id, status)
        });
        join_all(exchanges).await.into_iter().collect()
    }

    /// Tell every worker to stop and reap them all. Blocks until each
    /// process has exited.
    pub async fn terminate_all(&mut self) -> Vec<(WorkerId, ExitOutcome)> {
        let terminate = Frame::command(self.next_seq, ControlMessage::Terminate);
        let deadline = Instant::now() + self.poll_timeout;
        let deliveries = self.running.iter_mut().map(|(id, record)| async move {
            match timeout_at(deadline, record.channel.send(&terminate)).await {
                Ok(Ok(())) => {}
                // already gone; reaping below still collects it
                Ok(Err(e)) => debug!("Terminate to {id} not delivered: {e}"),
                Err(_) => warn!("Terminate to {id} not delivered, channel is not being read"),
            }
        });
        join_all(deliveries).await;

        let running = std::mem::take(&mut self.running);
        let mut outcomes = Vec::with_capacity(running.len());
        for (id, mut record) in running {
            let outcome = match record.child.wait().await {
                Ok(status) => ExitOutcome::from(status),
                Err(e) => {
                    warn!("Waiting for {id} failed: {e}");
                    ExitOutcome::Unknown
                }
            };
            info!("{id} (pid {:?}) {outcome}", record.pid);
            outcomes.push((id, outcome));
        }
        outcomes
    }
}

/// One status round trip with a single worker, bounded by `deadline`.
async fn exchange_status(
    channel: &mut ChannelEndpoint,
    id: WorkerId,
    seq: u32,
    deadline: Instant,
) -> WorkerStatus {
    let request = Frame::command(seq, ControlMessage::StatusRequest);
    let delivery = timeout_at(deadline, async {
        // an earlier request still stuck in the socket goes out first;
        // nothing is queued behind it until it has
        if channel.backlog() > 0 {
            if let Err(e) = channel.flush().await {
                return Err(e);
            }
        }
        channel.send(&request).await
    })
    .await;
    match delivery {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!("Status request to {id} failed: {e}");
            return WorkerStatus::Unknown;
        }
        Err(_) => {
            warn!("{id} is not reading its control channel");
            return WorkerStatus::Unknown;
        }
    }

    match await_reply(channel, id, seq, deadline).await {
        Ok(status) => status,
        Err(e) => {
            warn!("{e}");
            WorkerStatus::Unknown
        }
    }
}

/// Read frames until the reply to `seq` arrives. Replies to earlier
/// requests are discarded.
pub(crate) async fn await_reply(
    channel: &mut ChannelEndpoint,
    id: WorkerId,
    seq: u32,
    deadline: Instant,
) -> WardenResult<WorkerStatus> {
    loop {
        match timeout_at(deadline, channel.recv()).await {
            Err(_) => return Err(WardenError::unresponsive(id.to_string())),
            Ok(Ok(Some(Frame::StatusReply { seq: got, status }))) if got == seq => {
                return Ok(status)
            }
            Ok(Ok(Some(frame))) => {
                debug!("Discarding stale frame {} from {id}: {frame:?}", frame.seq());
            }
            Ok(Ok(None)) => {
                return Err(WardenError::protocol(format!(
                    "{id} closed its control channel"
                )))
            }
            Ok(Err(e)) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream as StdUnixStream;
    use std::process::Stdio;
    use tokio::process::{Child, Command};
    use warden_core::{SensorKind, FRAME_LEN};

    /// Starts `head -c 8`: it swallows exactly one frame and exits 0.
    struct OneFrameLauncher;

    impl WorkerLauncher for OneFrameLauncher {
        fn launch(&self, _config: &WorkerConfig, channel: StdUnixStream) -> WardenResult<Child> {
            Command::new("head")
                .args(["-c", "8"])
                .stdin(Stdio::from(OwnedFd::from(channel)))
                .stdout(Stdio::null())
                .spawn()
                .map_err(|e| WardenError::spawn(e.to_string()))
        }
    }

    /// Starts `sleep`: alive, but never reads or answers its channel.
    struct StuckLauncher;

    impl WorkerLauncher for StuckLauncher {
        fn launch(&self, _config: &WorkerConfig, channel: StdUnixStream) -> WardenResult<Child> {
            Command::new("sleep")
                .arg("30")
                .stdin(Stdio::from(OwnedFd::from(channel)))
                .stdout(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| WardenError::spawn(e.to_string()))
        }
    }

    struct BrokenLauncher;

    impl WorkerLauncher for BrokenLauncher {
        fn launch(&self, _config: &WorkerConfig, _channel: StdUnixStream) -> WardenResult<Child> {
            Err(WardenError::spawn("no such program"))
        }
    }

    fn config(address: u8) -> WorkerConfig {
        WorkerConfig::new(SensorKind::Ntc, address, "ntc.txt", false, 1)
    }

    fn after_ms(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    fn supervisor(capacity: usize) -> WorkerSupervisor {
        WorkerSupervisor::new(
            Box::new(OneFrameLauncher),
            capacity,
            Duration::from_millis(200),
        )
    }

    #[test]
    fn test_register_respects_capacity() {
        let mut supervisor = supervisor(2);
        let first = supervisor.register(config(0x48)).unwrap();
        let second = supervisor.register(config(0x49)).unwrap();
        assert_ne!(first, second);

        let rejected = supervisor.register(config(0x4a));
        assert!(matches!(rejected, Err(WardenError::Capacity { capacity: 2 })));
        assert_eq!(supervisor.configured_count(), 2);
        let queued: Vec<u8> = supervisor
            .pending
            .iter()
            .map(|(_, config)| config.address())
            .collect();
        assert_eq!(queued, vec![0x48, 0x49]);
    }

    #[tokio::test]
    async fn test_spawn_next_is_one_per_call_and_idempotent_when_empty() {
        let mut supervisor = supervisor(4);
        let id = supervisor.register(config(0x48)).unwrap();

        assert_eq!(supervisor.spawn_next().unwrap(), Some(id));
        assert_eq!(supervisor.running_count(), 1);
        assert_eq!(supervisor.pending_count(), 0);
        let record = supervisor.record(id).unwrap();
        assert_eq!(record.status(), WorkerStatus::Starting);
        assert!(record.pid().is_some());

        assert_eq!(supervisor.spawn_next().unwrap(), None);
        assert_eq!(supervisor.running_count(), 1);

        let outcomes = supervisor.terminate_all().await;
        assert_eq!(outcomes, vec![(id, ExitOutcome::Exited(0))]);
    }

    #[tokio::test]
    async fn test_silent_worker_polls_unknown_and_is_reaped() {
        let mut supervisor = supervisor(4);
        let a = supervisor.register(config(0x48)).unwrap();
        let b = supervisor.register(config(0x49)).unwrap();
        supervisor.spawn_next().unwrap();
        supervisor.spawn_next().unwrap();

        let statuses = supervisor.poll_all().await;
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[&a], WorkerStatus::Unknown);
        assert_eq!(statuses[&b], WorkerStatus::Unknown);
        assert!(statuses.values().all(|s| *s != WorkerStatus::Error));

        let outcomes = supervisor.terminate_all().await;
        assert_eq!(supervisor.running_count(), 0);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|(_, outcome)| *outcome == ExitOutcome::Exited(0)));
    }

    #[tokio::test]
    async fn test_failed_launch_keeps_config_pending() {
        let mut supervisor =
            WorkerSupervisor::new(Box::new(BrokenLauncher), 2, Duration::from_millis(100));
        supervisor.register(config(0x48)).unwrap();

        let err = supervisor.spawn_next().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(supervisor.pending_count(), 1);
        assert_eq!(supervisor.running_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_reply_is_discarded() {
        let (mut ours, worker_side) = ControlChannel::pair().unwrap();
        let mut worker = ChannelEndpoint::from_std(worker_side).unwrap();
        worker
            .send(&Frame::reply(6, WorkerStatus::Error))
            .await
            .unwrap();
        worker
            .send(&Frame::reply(7, WorkerStatus::Running))
            .await
            .unwrap();

        let status = await_reply(&mut ours, WorkerId::new(1), 7, after_ms(200))
            .await
            .unwrap();
        assert_eq!(status, WorkerStatus::Running);
    }

    #[tokio::test]
    async fn test_missing_reply_times_out() {
        let (mut ours, _worker_side) = ControlChannel::pair().unwrap();
        let started = Instant::now();
        let result = await_reply(&mut ours, WorkerId::new(3), 1, after_ms(50)).await;
        assert!(matches!(result, Err(WardenError::WorkerUnresponsive { .. })));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_late_reply_not_attributed_to_next_poll() {
        let (mut ours, worker_side) = ControlChannel::pair().unwrap();
        let mut worker = ChannelEndpoint::from_std(worker_side).unwrap();

        let first = await_reply(&mut ours, WorkerId::new(1), 1, after_ms(30)).await;
        assert!(first.is_err());

        // the answer to poll 1 arrives during poll 2
        worker
            .send(&Frame::reply(1, WorkerStatus::Error))
            .await
            .unwrap();
        worker
            .send(&Frame::reply(2, WorkerStatus::Running))
            .await
            .unwrap();
        let second = await_reply(&mut ours, WorkerId::new(1), 2, after_ms(200))
            .await
            .unwrap();
        assert_eq!(second, WorkerStatus::Running);
    }

    #[tokio::test]
    async fn test_worker_that_stops_reading_never_stalls_polling() {
        let mut supervisor =
            WorkerSupervisor::new(Box::new(StuckLauncher), 1, Duration::from_millis(5));
        let id = supervisor.register(config(0x48)).unwrap();
        supervisor.spawn_next().unwrap();

        // far more requests than the socket buffer holds
        for round in 0..600 {
            let statuses = tokio::time::timeout(Duration::from_secs(2), supervisor.poll_all())
                .await
                .unwrap_or_else(|_| panic!("poll round {round} stalled"));
            assert_eq!(statuses[&id], WorkerStatus::Unknown);
        }
        let record = supervisor.running.get(&id).unwrap();
        assert!(record.channel.backlog() <= FRAME_LEN);
    }

    #[tokio::test]
    async fn test_silent_workers_share_one_poll_deadline() {
        let mut supervisor =
            WorkerSupervisor::new(Box::new(StuckLauncher), 3, Duration::from_millis(200));
        for address in [0x48, 0x49, 0x4a] {
            supervisor.register(config(address)).unwrap();
            supervisor.spawn_next().unwrap();
        }

        let started = Instant::now();
        let statuses = supervisor.poll_all().await;
        let elapsed = started.elapsed();

        assert_eq!(statuses.len(), 3);
        assert!(statuses.values().all(|s| *s == WorkerStatus::Unknown));
        assert!(
            elapsed < Duration::from_millis(450),
            "three silent workers took {elapsed:?}"
        );
    }
}
