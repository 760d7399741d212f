//! Periodic scheduling of reconciliation passes.
//!
//! Update-coordinator pattern: one pass at startup, then a fixed interval.
//! A failed pass only surfaces through the log and the health snapshot; the
//! next tick retries from scratch. There is no partial-completion resumption,
//! a failed pass is simply superseded.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time;
use tracing::error;
use tracing::info;

use crate::reconcile::ReconcileSummary;
use crate::reconcile::Reconciler;
use crate::reconcile::UpdateError;

/// Health of the reconciliation loop, surfaced by `/v1/health`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthStatus {
    /// Whether the most recent pass succeeded. False until the first pass
    /// completes.
    pub healthy: bool,

    /// Passes attempted since startup.
    pub passes: u64,

    /// Failures since the last successful pass.
    pub consecutive_failures: u32,

    /// Sensors linked to the device over the daemon's lifetime.
    pub total_associated: u64,

    /// Message of the most recent failure, cleared on success.
    pub last_error: Option<String>,
}

/// Shared handle to the loop's health snapshot.
#[derive(Debug, Clone, Default)]
pub struct Health(Arc<Mutex<HealthStatus>>);

impl Health {
    pub fn snapshot(&self) -> HealthStatus {
        self.0.lock().expect("health lock poisoned").clone()
    }

    fn record_success(&self, summary: &ReconcileSummary) {
        let mut status = self.0.lock().expect("health lock poisoned");
        status.healthy = true;
        status.passes += 1;
        status.consecutive_failures = 0;
        status.total_associated += summary.associated as u64;
        status.last_error = None;
    }

    fn record_failure(&self, err: &UpdateError) {
        let mut status = self.0.lock().expect("health lock poisoned");
        status.healthy = false;
        status.passes += 1;
        status.consecutive_failures += 1;
        status.last_error = Some(err.to_string());
    }
}

/// Runs the reconciler on a fixed timer.
pub struct Coordinator {
    reconciler: Reconciler,
    interval: Duration,
    health: Health,
}

impl Coordinator {
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            reconciler,
            // tokio::time::interval panics on a zero period
            interval: interval.max(Duration::from_millis(1)),
            health: Health::default(),
        }
    }

    /// Handle for readers; stays valid after `run` consumes the coordinator.
    pub fn health(&self) -> Health {
        self.health.clone()
    }

    /// Run passes until the shutdown signal fires.
    ///
    /// The first pass runs immediately, matching the original first-refresh
    /// behavior; the daemon stays up even if it fails and retries on the
    /// next tick.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        info!(interval_secs = self.interval.as_secs(), "coordinator starting");
        self.tick().await;

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // An interval's first tick completes immediately; the startup pass
        // already covered it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = &mut shutdown => {
                    info!("coordinator stopping");
                    return;
                }
            }
        }
    }

    async fn tick(&self) {
        match self.reconciler.reconcile().await {
            Ok(summary) => self.health.record_success(&summary),
            Err(e) => {
                error!("update failed: {e}");
                self.health.record_failure(&e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use serde_json::Map;
    use serde_json::Value;

    use super::*;
    use crate::registry::MemoryDeviceRegistry;
    use crate::registry::MemoryEntityRegistry;
    use crate::registry::MemoryStateStore;
    use crate::registry::StateEntry;

    #[tokio::test]
    async fn test_run_records_health() {
        let states = Arc::new(MemoryStateStore::new());
        let attributes = match json!({"source": "hass_mac_sensor_agent"}) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        states.upsert(StateEntry {
            entity_id: "sensor.cpu_usage".to_string(),
            state: "12.5".to_string(),
            attributes,
        });

        let reconciler = Reconciler::new(
            Arc::new(MemoryDeviceRegistry::new()),
            Arc::new(MemoryEntityRegistry::new()),
            states,
        );
        let coordinator = Coordinator::new(reconciler, Duration::from_millis(10));
        let health = coordinator.health();
        assert!(!health.snapshot().healthy);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(coordinator.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        let status = health.snapshot();
        assert!(status.healthy);
        assert!(status.passes >= 1);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.total_associated, 1);
        assert!(status.last_error.is_none());
    }
}
