use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use warden_core::QuitSignal;

/// Route SIGINT and SIGTERM into `quit`. Handlers are installed before
/// this returns, so a failure here is reported to the caller.
pub fn install_quit_listener(quit: QuitSignal) -> Result<()> {
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = interrupt.recv() => info!("Received SIGINT"),
                Some(()) = terminate.recv() => info!("Received SIGTERM"),
                else => break,
            }
            quit.raise();
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_raises_quit() {
        let quit = QuitSignal::new();
        install_quit_listener(quit.clone()).unwrap();

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(2), quit.notified())
            .await
            .unwrap();
        assert!(quit.is_raised());
    }
}
