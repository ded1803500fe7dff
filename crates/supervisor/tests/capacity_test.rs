use std::os::unix::net::UnixStream as StdUnixStream;
use std::time::Duration;

use tokio::process::Child;
use warden_core::{SensorKind, WardenError, WardenResult, WorkerConfig};
use warden_supervisor::{WorkerLauncher, WorkerSupervisor};

struct NeverLaunched;

impl WorkerLauncher for NeverLaunched {
    fn launch(&self, _config: &WorkerConfig, _channel: StdUnixStream) -> WardenResult<Child> {
        Err(WardenError::spawn("launch not expected"))
    }
}

fn config(address: u8, interval: i64) -> WorkerConfig {
    WorkerConfig::new(SensorKind::Scc, address, "co2.txt", false, interval)
}

#[test]
fn test_full_table_rejects_without_disturbing_entries() {
    let mut supervisor =
        WorkerSupervisor::new(Box::new(NeverLaunched), 16, Duration::from_millis(500));
    let ids: Vec<_> = (0..16u8)
        .map(|n| supervisor.register(config(n, i64::from(n))).unwrap())
        .collect();
    assert_eq!(supervisor.configured_count(), 16);

    for _ in 0..3 {
        let result = supervisor.register(config(0x7f, 1));
        assert!(matches!(result, Err(WardenError::Capacity { capacity: 16 })));
    }
    assert_eq!(supervisor.configured_count(), 16);
    assert_eq!(supervisor.pending_count(), 16);

    // identifiers are unique and increasing
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_spawn_without_pending_is_noop() {
    let mut supervisor =
        WorkerSupervisor::new(Box::new(NeverLaunched), 4, Duration::from_millis(500));
    assert_eq!(supervisor.spawn_next().unwrap(), None);
    assert_eq!(supervisor.spawn_next().unwrap(), None);
    assert_eq!(supervisor.running_count(), 0);
    assert_eq!(supervisor.records().count(), 0);
}

#[test]
fn test_non_positive_intervals_become_one() {
    for interval in [0, -1, -500] {
        assert_eq!(config(0x10, interval).interval(), 1);
    }
}
