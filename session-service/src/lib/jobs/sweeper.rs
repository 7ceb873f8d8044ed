use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::session::ports::SessionServicePort;

/// Run `sweep_expired` every `interval` until the task is aborted.
///
/// The first sweep runs immediately. Failures are logged and retried on the
/// next tick.
pub fn spawn_expiry_sweeper<S>(service: Arc<S>, interval: Duration) -> JoinHandle<()>
where
    S: SessionServicePort,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_seconds = interval.as_secs(), "Expiry sweeper started");

        loop {
            ticker.tick().await;

            match service.sweep_expired().await {
                Ok(removed) => {
                    tracing::debug!(removed, "Expiry sweep completed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Expiry sweep failed");
                }
            }
        }
    })
}
