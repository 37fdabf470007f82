use super::{today, SharedLedger};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Background loop that clears the per-minute request window and applies
/// the calendar-day token reset. Dropping the guard stops the loop.
pub struct ResetTask {
    shutdown_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ResetTask {
    pub fn spawn(ledger: SharedLedger, period: Duration) -> Self {
        let shutdown_token = CancellationToken::new();
        let shutdown = shutdown_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(period_secs = period.as_secs(), "Usage reset task started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Usage reset task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let day = today();
                        ledger.with(|ledger| {
                            ledger.reset_minute_window();
                            ledger.rollover(&day);
                        });
                    }
                }
            }
        });

        Self {
            shutdown_token,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        self.shutdown_token.cancel();
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Usage reset task ended abnormally");
            }
        }
    }
}

impl Drop for ResetTask {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
