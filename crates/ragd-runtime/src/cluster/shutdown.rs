use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Which notification triggered shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / ctrl-c.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Requested from inside the process.
    Requested,
    /// Startup could not complete.
    Fatal,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interrupt => "interrupt",
            Self::Terminate => "terminate",
            Self::Requested => "requested",
            Self::Fatal => "fatal",
        }
    }
}

/// Turns OS termination signals into a cooperative cancellation token.
///
/// The token is cancelled once and never reset. Background loops receive
/// clones of it and observe cancellation at their own pace; the process then
/// waits at most `grace_period` before exiting.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
    reason: Arc<OnceLock<ShutdownReason>>,
}

impl ShutdownCoordinator {
    /// Create a new coordinator.
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
            reason: Arc::new(OnceLock::new()),
        }
    }

    /// The cancellation token to hand to background loops.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The reason recorded by the first trigger.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Cancel the token. Only the first call records its reason.
    pub fn trigger(&self, reason: ShutdownReason) {
        if self.reason.set(reason).is_ok() {
            tracing::info!(reason = reason.as_str(), "Shutdown requested");
        }
        self.token.cancel();
    }

    /// Wait until the token is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Listen for SIGINT and SIGTERM in the background.
    pub fn install_signal_handlers(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                reason = wait_for_signal() => {
                    match reason {
                        Ok(reason) => {
                            tracing::info!(signal = reason.as_str(), "Received signal, shutting down");
                            coordinator.trigger(reason);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to install signal handlers");
                        }
                    }
                }
                _ = coordinator.token.cancelled() => {}
            }
        })
    }

    /// Wait for every task in `tasks` to finish, sharing one grace period.
    ///
    /// Tasks still running when it elapses are aborted. Returns `true` when
    /// all of them finished in time.
    pub async fn drain<T: 'static>(&self, tasks: &mut JoinSet<T>) -> bool {
        let finished = tokio::time::timeout(self.grace_period, async {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Background task ended abnormally");
                }
            }
        })
        .await
        .is_ok();

        if !finished {
            tracing::warn!(
                grace_period = ?self.grace_period,
                remaining = tasks.len(),
                "Background tasks still running after grace period, aborting"
            );
            tasks.abort_all();
        }
        finished
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<ShutdownReason> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| ShutdownReason::Interrupt),
        _ = terminate.recv() => Ok(ShutdownReason::Terminate),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<ShutdownReason> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownReason::Interrupt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_is_sticky() {
        let shutdown = ShutdownCoordinator::new(Duration::from_secs(1));
        assert!(!shutdown.is_shutdown_requested());

        shutdown.trigger(ShutdownReason::Terminate);
        shutdown.trigger(ShutdownReason::Interrupt);

        assert!(shutdown.is_shutdown_requested());
        assert!(shutdown.token().is_cancelled());
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Terminate));
    }

    #[tokio::test]
    async fn test_cancelled_wakes_after_trigger() {
        let shutdown = ShutdownCoordinator::new(Duration::from_secs(1));
        let waiter = shutdown.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        shutdown.trigger(ShutdownReason::Requested);
        assert!(handle.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_gives_up_after_grace_period() {
        let shutdown = ShutdownCoordinator::new(Duration::from_secs(1));
        let mut tasks = JoinSet::new();
        tasks.spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        tasks.spawn(async {});

        let started = tokio::time::Instant::now();
        assert!(!shutdown.drain(&mut tasks).await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_shares_one_grace_period() {
        let shutdown = ShutdownCoordinator::new(Duration::from_secs(1));
        let mut tasks = JoinSet::new();
        for _ in 0..3 {
            tasks.spawn(async {
                tokio::time::sleep(Duration::from_millis(700)).await;
            });
        }

        assert!(shutdown.drain(&mut tasks).await);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_signal_listener_stops_on_cancel() {
        let shutdown = ShutdownCoordinator::new(Duration::from_secs(1));
        let listener = shutdown.install_signal_handlers();

        shutdown.trigger(ShutdownReason::Requested);
        assert!(listener.await.is_ok());
    }
}
