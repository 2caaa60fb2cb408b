use crate::store::result_store::ResultStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Sweeps `store` every `interval` until `cancel_token` fires.
pub fn spawn_sweeper(
    store: Arc<ResultStore>,
    interval: Duration,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!("Result sweeper started, interval {:?}", interval);
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("Result sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = store.sweep();
                    debug!("Periodic sweep removed {} results, {} remain", removed, store.len());
                }
            }
        }
    })
}
