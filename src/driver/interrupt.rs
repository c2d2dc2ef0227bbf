//! Interrupt routing
//!
//! An operator abort cancels the batch's token. The active test case
//! observes the token inside its wait loop and kills its child before the
//! driver closes the log, so no test process outlives the run.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancel `token` on SIGINT or SIGTERM
///
/// The listener stops once the token is cancelled by anyone, so dropping
/// the returned handle at the end of a batch is enough.
pub fn install(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            received = wait_for_interrupt() => {
                match received {
                    Ok(name) => {
                        eprintln!();
                        tracing::warn!("Received {}, aborting current test...", name);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not install interrupt handler");
                        return;
                    }
                }
                token.cancel();
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_interrupt() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => Ok("SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_listener_exits_when_token_cancelled() {
        let token = CancellationToken::new();
        let handle = install(token.clone());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("listener should stop after cancellation")
            .unwrap();
    }
}
