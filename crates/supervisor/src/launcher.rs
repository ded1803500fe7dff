use std::ffi::OsString;
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::debug;
use warden_core::{WardenError, WardenResult, WorkerConfig};

/// Starts worker processes.
pub trait WorkerLauncher: Send {
    /// Start a worker for `config`. `channel` is the worker's end of its
    /// control channel and must become the child's stdin.
    fn launch(&self, config: &WorkerConfig, channel: StdUnixStream) -> WardenResult<Child>;
}

/// Launches workers by re-executing a binary with its `worker` subcommand.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    leading_args: Vec<OsString>,
    tick: Duration,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, tick: Duration) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            tick,
        }
    }

    /// Launch workers from the running executable.
    pub fn current_exe(tick: Duration) -> WardenResult<Self> {
        let program = std::env::current_exe()
            .map_err(|e| WardenError::spawn(format!("cannot locate own executable: {e}")))?;
        Ok(Self::new(program, tick))
    }

    /// Arguments placed before the `worker` subcommand.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn worker_args(config: &WorkerConfig, tick: Duration) -> Vec<OsString> {
        vec![
            "worker".into(),
            "--sensor-type".into(),
            config.kind().as_str().into(),
            "--sensor-address".into(),
            format!("0x{:02X}", config.address()).into(),
            "--measurement-log".into(),
            config.log_path().as_os_str().to_owned(),
            "--echo".into(),
            if config.echo() { "on" } else { "off" }.into(),
            "--interval".into(),
            config.interval().to_string().into(),
            "--tick-ms".into(),
            tick.as_millis().to_string().into(),
        ]
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, config: &WorkerConfig, channel: StdUnixStream) -> WardenResult<Child> {
        let args = Self::worker_args(config, self.tick);
        debug!("Launching {} {:?} {:?}", self.program.display(), self.leading_args, args);

        Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::from(OwnedFd::from(channel)))
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            // keep terminal interrupts away from workers; quitting is the supervisor's call
            .process_group(0)
            .spawn()
            .map_err(|e| WardenError::spawn(format!("{}: {e}", self.program.display())))
    }
}
