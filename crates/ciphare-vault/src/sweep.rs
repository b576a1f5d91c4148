//! Periodic deletion of expired artifacts
//!
//! Lazy expiry on lookup already keeps expired artifacts unreadable; the
//! sweeper only reclaims storage for ones nobody asks for again.

use std::time::Duration;

use ciphare_core::types::unix_now;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::vault::Vault;

/// Spawn the sweep loop. `on_swept` receives the number of artifacts
/// destroyed by each pass. The loop exits when `shutdown` flips to true or
/// its sender is dropped.
pub fn spawn_sweeper<F>(
    vault: Vault,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    on_swept: F,
) -> JoinHandle<()>
where
    F: Fn(usize) + Send + 'static,
{
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "expiry sweeper started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match vault.sweep_expired(unix_now()).await {
                        Ok(destroyed) => {
                            debug!(destroyed, "sweep pass complete");
                            on_swept(destroyed);
                        }
                        // Retried on the next tick
                        Err(e) => warn!("sweep pass failed: {e}"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("expiry sweeper stopped");
    })
}
