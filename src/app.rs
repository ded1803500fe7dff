use anyhow::{Context, Result};
use tracing::{info, warn};
use warden_control_plane::{ControlPlaneClient, ControlPlaneServer};
use warden_core::{AppConfig, ConfigInbox, Logbook, QuitSignal, WorkerConfig};
use warden_supervisor::{ProcessLauncher, SchedulerLoop, StdinPrompt, WorkerSupervisor};

use crate::cli::OperatingMode;
use crate::shutdown::install_quit_listener;

pub const NAME: &str = "Warden";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The supervisor process: settings, operating mode and the startup
/// definitions, plus the master log every mode writes to.
pub struct Application {
    config: AppConfig,
    mode: OperatingMode,
    definitions: Vec<WorkerConfig>,
    master_log: Logbook,
}

impl Application {
    pub fn new(
        config: AppConfig,
        mode: OperatingMode,
        definitions: Vec<WorkerConfig>,
    ) -> Result<Self> {
        let master_log = Logbook::open(&config.supervisor.master_log).with_context(|| {
            format!(
                "cannot open master log {}",
                config.supervisor.master_log.display()
            )
        })?;
        Ok(Self {
            config,
            mode,
            definitions,
            master_log,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown host".to_string());
        self.log(format!("{NAME} {VERSION} started on {host} ({:?} mode)", self.mode));

        match self.mode.clone() {
            OperatingMode::NetworkClient { target } => self.run_client(&target).await,
            OperatingMode::Local => self.run_supervisor(None).await,
            OperatingMode::NetworkServer => {
                let server = match ControlPlaneServer::bind(&self.config.control_plane).await {
                    Ok(server) => server,
                    Err(e) => {
                        self.log(format!("Fatal error: {e}"));
                        return Err(e).context("cannot start the control plane");
                    }
                };
                let addr = server.local_addr();
                println!("Listening on {} port {}", addr.ip(), addr.port());
                self.run_supervisor(Some(Box::new(server))).await
            }
        }
    }

    async fn run_client(mut self, target: &str) -> Result<()> {
        if self.definitions.is_empty() {
            warn!("No valid worker definitions, nothing to send");
            self.log("No worker definitions to send");
            return Ok(());
        }

        let client = ControlPlaneClient::new(&self.config.control_plane);
        match client.send(target, &self.definitions).await {
            Ok(sent) => {
                info!("Delivered {sent} definitions to {target}");
                self.log("Command send successful");
                Ok(())
            }
            Err(e) => {
                self.log(format!("Fatal error: {e}"));
                Err(e).with_context(|| format!("cannot send definitions to {target}"))
            }
        }
    }

    async fn run_supervisor(mut self, inbox: Option<Box<dyn ConfigInbox>>) -> Result<()> {
        let quit = QuitSignal::new();
        if let Err(e) = install_quit_listener(quit.clone()) {
            self.log(format!("Fatal error: {e:#}"));
            return Err(e);
        }

        let settings = self.config.supervisor.clone();
        let launcher = match ProcessLauncher::current_exe(settings.tick_interval()) {
            Ok(launcher) => launcher.with_leading_args([
                "--log-level".to_string(),
                self.config.logging.level.to_string(),
                "--log-format".to_string(),
                self.config.logging.format.to_string(),
            ]),
            Err(e) => {
                self.log(format!("Fatal error: {e}"));
                return Err(e.into());
            }
        };

        let mut supervisor = WorkerSupervisor::new(
            Box::new(launcher),
            settings.capacity,
            settings.poll_timeout(),
        );
        for config in std::mem::take(&mut self.definitions) {
            let description = config.to_string();
            match supervisor.register(config) {
                Ok(id) => info!("Registered {id}: {description}"),
                Err(e) => warn!("Definition {description} not registered: {e}"),
            }
        }

        let mut scheduler = SchedulerLoop::new(
            supervisor,
            self.master_log,
            quit,
            Box::new(StdinPrompt::stdin()),
            &settings,
        );
        if let Some(inbox) = inbox {
            scheduler = scheduler.with_inbox(inbox);
        }

        let report = scheduler.run().await.context("supervisor stopped")?;
        info!(
            "Stopped after {} ticks, {} workers reaped",
            report.ticks,
            report.outcomes.len()
        );
        Ok(())
    }

    fn log(&mut self, event: impl AsRef<str>) {
        let event = event.as_ref();
        info!("{event}");
        if let Err(e) = self.master_log.record(event) {
            warn!("Master log not written: {e}");
        }
    }
}
