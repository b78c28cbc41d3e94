//! Recurring status evaluation.
//!
//! A [`StatusMonitor`] ticks on a tokio interval, asks its
//! [`SnapshotSource`] for the latest drinks and profile, runs the engine off
//! the async workers and publishes an immutable [`PublishedStatus`] on a
//! watch channel. Each tick gets a generation number; a result that arrives
//! after a newer one has been published is dropped. A tick that fires while
//! the previous evaluation is still running is skipped. Stage escalations
//! are reported on a separate alert channel.

use crate::engine::resolve_peer_status_with;
use crate::simulator::SimulationParams;
use crate::stage::{should_notify, BacStage};
use crate::{BacStatus, PeerSnapshot, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Supplies the data to evaluate on each tick
///
/// Any fetching or syncing happens here, before the engine is called.
pub trait SnapshotSource: Send + Sync + 'static {
    fn snapshot(&self) -> Result<PeerSnapshot>;
}

/// Wall clock in epoch milliseconds, injectable for tests
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// The system clock
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

/// One published evaluation
#[derive(Clone, Debug, PartialEq)]
pub struct PublishedStatus {
    pub generation: u64,
    pub computed_at_ms: i64,
    pub status: BacStatus,
}

/// Emitted when the stage gets more severe between publications
#[derive(Clone, Debug, PartialEq)]
pub struct StageAlert {
    pub from: BacStage,
    pub to: BacStage,
    pub at_ms: i64,
}

/// Publishing side of the monitor
///
/// Cloneable so that every in-flight evaluation can publish independently.
#[derive(Clone)]
pub struct Publisher {
    status_tx: Arc<watch::Sender<Option<Arc<PublishedStatus>>>>,
    alert_tx: mpsc::UnboundedSender<StageAlert>,
}

impl Publisher {
    /// Create a publisher with its status and alert receivers
    pub fn new() -> (
        Self,
        watch::Receiver<Option<Arc<PublishedStatus>>>,
        mpsc::UnboundedReceiver<StageAlert>,
    ) {
        let (status_tx, status_rx) = watch::channel(None);
        let (alert_tx, alert_rx) = mpsc::unbounded_channel();
        (
            Self {
                status_tx: Arc::new(status_tx),
                alert_tx,
            },
            status_rx,
            alert_rx,
        )
    }

    /// Publish a result unless a newer generation is already out
    ///
    /// Returns whether the result was published.
    pub fn publish(&self, candidate: PublishedStatus) -> bool {
        let alert_tx = &self.alert_tx;
        self.status_tx.send_if_modified(|current| {
            if let Some(existing) = current {
                if existing.generation >= candidate.generation {
                    tracing::debug!(
                        "Discarding superseded result {} (have {})",
                        candidate.generation,
                        existing.generation
                    );
                    return false;
                }
                if should_notify(existing.status.stage, candidate.status.stage) {
                    let alert = StageAlert {
                        from: existing.status.stage,
                        to: candidate.status.stage,
                        at_ms: candidate.computed_at_ms,
                    };
                    tracing::info!("Stage escalated from {} to {}", alert.from, alert.to);
                    // No receiver just means nobody listens for alerts
                    let _ = alert_tx.send(alert);
                }
            }
            *current = Some(Arc::new(candidate));
            true
        })
    }
}

/// Handle to a running monitor task
pub struct StatusMonitor {
    status_rx: watch::Receiver<Option<Arc<PublishedStatus>>>,
    alert_rx: mpsc::UnboundedReceiver<StageAlert>,
    task: JoinHandle<()>,
}

impl StatusMonitor {
    /// Start ticking every `interval`; the first tick fires immediately
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: SnapshotSource>(
        source: Arc<S>,
        params: SimulationParams,
        interval: Duration,
        clock: Clock,
    ) -> Self {
        let (publisher, status_rx, alert_rx) = Publisher::new();
        let params = Arc::new(params);
        let generations = Arc::new(AtomicU64::new(0));
        let in_flight = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if in_flight.swap(true, Ordering::SeqCst) {
                    tracing::debug!("Previous evaluation still running, skipping tick");
                    continue;
                }
                let generation = generations.fetch_add(1, Ordering::SeqCst) + 1;
                let source = Arc::clone(&source);
                let params = Arc::clone(&params);
                let clock = Arc::clone(&clock);
                let publisher = publisher.clone();
                let in_flight = Arc::clone(&in_flight);

                tokio::spawn(async move {
                    let evaluated = tokio::task::spawn_blocking(move || {
                        let now_ms = clock();
                        evaluate(source.as_ref(), &params, now_ms).map(|status| (now_ms, status))
                    })
                    .await;

                    match evaluated {
                        Ok(Ok((now_ms, status))) => {
                            publisher.publish(PublishedStatus {
                                generation,
                                computed_at_ms: now_ms,
                                status,
                            });
                        }
                        Ok(Err(e)) => tracing::warn!("Skipping tick {}: {}", generation, e),
                        Err(e) => tracing::error!("Evaluation task {} failed: {}", generation, e),
                    }
                    in_flight.store(false, Ordering::SeqCst);
                });
            }
        });

        Self {
            status_rx,
            alert_rx,
            task,
        }
    }

    /// Receiver that sees every new publication
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PublishedStatus>>> {
        self.status_rx.clone()
    }

    /// Most recent publication, if any
    pub fn latest(&self) -> Option<Arc<PublishedStatus>> {
        self.status_rx.borrow().clone()
    }

    /// Wait for the next stage escalation
    pub async fn next_alert(&mut self) -> Option<StageAlert> {
        self.alert_rx.recv().await
    }

    /// Stage escalation if one is already queued
    pub fn try_alert(&mut self) -> Option<StageAlert> {
        self.alert_rx.try_recv().ok()
    }

    /// Stop ticking
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn evaluate<S: SnapshotSource + ?Sized>(
    source: &S,
    params: &SimulationParams,
    now_ms: i64,
) -> Result<BacStatus> {
    let snapshot = source.snapshot()?;
    resolve_peer_status_with(params, &snapshot, now_ms)
}
