//! Dispatch bus for chaos actions.
//!
//! The executor hands each action to an [`EventBus`] as a zero-argument
//! [`Payload`] and moves on as soon as the bus accepts it. Whether the action
//! later succeeds is only visible to bus subscribers, never to the run.

use crate::error::{GlitchError, Result};
use crate::shutdown::ShutdownCoordinator;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error};

/// A deferred unit of work. Calling it starts the action.
pub type Payload = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// Fire-and-forget scheduling of payloads onto the host's runtime.
pub trait EventBus: Send + Sync {
    /// Accept a payload for execution. Returns once accepted, not once run.
    fn dispatch(&self, origin: &str, payload: Payload, kind: &str) -> Result<()>;
}

/// Lifecycle stage of a dispatched payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Accepted,
    Completed,
    Failed { error: String },
}

/// Event broadcast to bus subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    /// Dispatch ID, shared by every event of one payload
    pub id: String,
    pub origin: String,
    pub kind: String,
    pub status: DispatchStatus,
    pub timestamp: DateTime<Utc>,
}

/// Bus statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusStats {
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Default)]
struct BusStatsInner {
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// In-process bus that spawns payloads as tokio tasks.
pub struct LocalBus {
    broadcast: broadcast::Sender<BusEvent>,
    stats: Arc<BusStatsInner>,
    accepting: AtomicBool,
}

impl LocalBus {
    pub fn new(buffer_size: usize) -> Arc<Self> {
        let (broadcast, _) = broadcast::channel(buffer_size);
        Arc::new(Self {
            broadcast,
            stats: Arc::new(BusStatsInner::default()),
            accepting: AtomicBool::new(true),
        })
    }

    /// Subscribe to dispatch lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.broadcast.subscribe()
    }

    /// Refuse all further dispatches. Already spawned payloads keep running.
    pub fn close(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            dispatched: self.stats.dispatched.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    /// Number of accepted payloads that have not finished yet.
    pub fn in_flight(&self) -> u64 {
        let stats = self.stats();
        stats
            .dispatched
            .saturating_sub(stats.completed + stats.failed)
    }

    /// Wait until every accepted payload has finished, or `timeout` elapses.
    ///
    /// Returns whether the bus settled in time.
    pub async fn wait_settled(&self, timeout: Duration) -> bool {
        let settle = async {
            while self.in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(timeout, settle).await.is_ok()
    }

    /// Like [`wait_settled`](Self::wait_settled), but gives up as soon as
    /// `shutdown` fires.
    pub async fn wait_settled_or_shutdown(
        &self,
        timeout: Duration,
        shutdown: &ShutdownCoordinator,
    ) -> bool {
        tokio::select! {
            settled = self.wait_settled(timeout) => settled,
            _ = shutdown.wait_for_shutdown() => false,
        }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        let (broadcast, _) = broadcast::channel(1000);
        Self {
            broadcast,
            stats: Arc::new(BusStatsInner::default()),
            accepting: AtomicBool::new(true),
        }
    }
}

impl EventBus for LocalBus {
    fn dispatch(&self, origin: &str, payload: Payload, kind: &str) -> Result<()> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(GlitchError::Dispatch("bus is closed".into()));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| GlitchError::Dispatch(format!("no runtime to spawn on: {}", e)))?;

        let event = BusEvent {
            id: uuid::Uuid::new_v4().to_string(),
            origin: origin.to_string(),
            kind: kind.to_string(),
            status: DispatchStatus::Accepted,
            timestamp: Utc::now(),
        };

        self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
        debug!(id = %event.id, origin, kind, "Payload accepted");
        let _ = self.broadcast.send(event.clone());

        let broadcast = self.broadcast.clone();
        let stats = Arc::clone(&self.stats);

        runtime.spawn(async move {
            // A panicking payload still has to count as finished.
            let outcome = AssertUnwindSafe(async move { payload().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(GlitchError::Dispatch(panic_message(&*panic))));

            let status = match outcome {
                Ok(()) => {
                    stats.completed.fetch_add(1, Ordering::Relaxed);
                    DispatchStatus::Completed
                }
                Err(e) => {
                    error!(id = %event.id, kind = %event.kind, "Dispatched payload failed: {}", e);
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    DispatchStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };

            let _ = broadcast.send(BusEvent {
                status,
                timestamp: Utc::now(),
                ..event
            });
        });

        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("payload panicked: {}", detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(result: Result<()>) -> Payload {
        Box::new(move || async move { result }.boxed())
    }

    #[tokio::test]
    async fn test_dispatch_reports_completion() {
        let bus = LocalBus::new(16);
        let mut rx = bus.subscribe();

        bus.dispatch("glitch", payload(Ok(())), "glitch.activate")
            .unwrap();

        let accepted = rx.recv().await.unwrap();
        assert_eq!(accepted.status, DispatchStatus::Accepted);
        assert_eq!(accepted.origin, "glitch");

        let done = rx.recv().await.unwrap();
        assert_eq!(done.id, accepted.id);
        assert_eq!(done.status, DispatchStatus::Completed);
        assert_eq!(bus.stats().completed, 1);
    }

    #[tokio::test]
    async fn test_dispatch_reports_failure() {
        let bus = LocalBus::new(16);
        let mut rx = bus.subscribe();

        bus.dispatch("glitch", payload(Err(GlitchError::NoUnits)), "glitch.activate")
            .unwrap();

        let _accepted = rx.recv().await.unwrap();
        let failed = rx.recv().await.unwrap();
        assert!(matches!(failed.status, DispatchStatus::Failed { .. }));
        assert_eq!(bus.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_wait_settled() {
        let bus = LocalBus::new(16);
        bus.dispatch(
            "glitch",
            Box::new(|| {
                async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok::<(), GlitchError>(())
                }
                .boxed()
            }),
            "glitch.activate",
        )
        .unwrap();

        assert!(bus.wait_settled(Duration::from_secs(5)).await);
        assert_eq!(bus.in_flight(), 0);
        assert_eq!(bus.stats().completed, 1);
    }

    #[tokio::test]
    async fn test_panicking_payload_counts_as_failed() {
        let bus = LocalBus::new(16);
        let mut rx = bus.subscribe();

        bus.dispatch(
            "glitch",
            Box::new(|| {
                async {
                    let explode = true;
                    if explode {
                        panic!("boom");
                    }
                    Ok::<(), GlitchError>(())
                }
                .boxed()
            }),
            "glitch.activate",
        )
        .unwrap();

        assert!(bus.wait_settled(Duration::from_secs(5)).await);
        assert_eq!(bus.in_flight(), 0);
        assert_eq!(bus.stats().failed, 1);

        let _accepted = rx.recv().await.unwrap();
        match rx.recv().await.unwrap().status {
            DispatchStatus::Failed { error } => assert!(error.contains("boom")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_settle_wait() {
        let bus = LocalBus::new(16);
        bus.dispatch(
            "glitch",
            Box::new(|| {
                async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok::<(), GlitchError>(())
                }
                .boxed()
            }),
            "glitch.activate",
        )
        .unwrap();

        let shutdown = ShutdownCoordinator::new();
        shutdown.shutdown();

        let settled = tokio::time::timeout(
            Duration::from_secs(1),
            bus.wait_settled_or_shutdown(Duration::from_secs(60), &shutdown),
        )
        .await
        .unwrap();
        assert!(!settled);
        assert_eq!(bus.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_closed_bus_refuses() {
        let bus = LocalBus::new(16);
        bus.close();

        let err = bus
            .dispatch("glitch", payload(Ok(())), "glitch.activate")
            .unwrap_err();
        assert!(matches!(err, GlitchError::Dispatch(_)));
        assert_eq!(bus.stats().dispatched, 0);
    }

    #[test]
    fn test_dispatch_without_runtime() {
        let bus = LocalBus::default();
        let err = bus
            .dispatch("glitch", payload(Ok(())), "glitch.activate")
            .unwrap_err();
        assert!(matches!(err, GlitchError::Dispatch(_)));
    }
}
