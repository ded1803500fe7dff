use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use warden::app::{Application, NAME, VERSION};
use warden::cli::{Cli, Command, WorkerArgs};
use warden::definitions::collect_definitions;
use warden::logging::init_logging;
use warden_core::{AppConfig, LogFormat, LogLevel, WorkerConfig};
use warden_worker::run_worker;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    if cli.help {
        println!("{NAME}\nVersion {VERSION}\n");
        println!("{}", Cli::usage());
        return ExitCode::from(1);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start the runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = if let Some(Command::Worker(args)) = &cli.command {
        runtime.block_on(worker_main(&cli, args.clone()))
    } else {
        runtime.block_on(supervisor_main(cli))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn supervisor_main(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("cannot load settings")?;
    cli.apply_overrides(&mut config)?;
    init_logging(config.logging.level, config.logging.format)?;

    println!("{NAME}\nVersion {VERSION}");
    let mode = cli.mode();
    info!("Operating mode: {mode:?}");

    let definitions = collect_definitions(
        &cli.definition,
        cli.file.as_deref(),
        config.supervisor.capacity,
    )?;
    info!("{} worker definitions at startup", definitions.len());

    Application::new(config, mode, definitions)?.run().await
}

async fn worker_main(cli: &Cli, args: WorkerArgs) -> Result<()> {
    let level = match &cli.log_level {
        Some(level) => level.parse::<LogLevel>()?,
        None => LogLevel::default(),
    };
    let format = match &cli.log_format {
        Some(format) => format.parse::<LogFormat>()?,
        None => LogFormat::Compact,
    };
    init_logging(level, format)?;

    let config = WorkerConfig::new(
        args.sensor_type,
        args.sensor_address,
        args.measurement_log,
        args.echo == "on",
        args.interval,
    );
    let summary = run_worker(config, Duration::from_millis(args.tick_ms.max(1))).await?;
    info!(
        "Worker finished ({:?}), {} measurements",
        summary.reason, summary.measurements
    );
    Ok(())
}
