//! Position writer.
//!
//! One queue per item id. Each queue holds only the newest position asked for
//! (latest wins) and is drained by a single task, so writes for one item never
//! race each other while different items are written concurrently. Failed
//! writes are retried with exponential backoff until the attempt budget runs
//! out; the final failure is logged and reported, never rolled back.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::config::PersistenceConfig;
use crate::layout::Position;
use crate::store::{ItemSink, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &PersistenceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.backoff_multiplier,
        }
    }

    /// Delay before retry number `attempt` (1 = first retry).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let millis = (self.initial_backoff.as_millis() as f64 * factor).min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PersistOutcome {
    Saved { attempts: u32 },
    /// A newer position for the same item arrived while this one was retrying.
    Superseded { attempts: u32 },
    Failed { attempts: u32, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistReport {
    pub item_id: String,
    pub position: Position,
    pub outcome: PersistOutcome,
}

#[derive(Default)]
struct QueueState {
    pending: HashMap<String, Position>,
    draining: HashSet<String>,
    /// Newest position per item, queued or in flight, until its queue drains.
    latest: HashMap<String, Position>,
}

struct Inner {
    sink: Arc<dyn ItemSink>,
    policy: RetryPolicy,
    state: Mutex<QueueState>,
    workers: watch::Sender<usize>,
    workers_rx: watch::Receiver<usize>,
    reports: broadcast::Sender<PersistReport>,
}

#[derive(Clone)]
pub struct PositionWriter {
    inner: Arc<Inner>,
}

impl PositionWriter {
    pub fn new(sink: Arc<dyn ItemSink>, policy: RetryPolicy) -> Self {
        let (workers, workers_rx) = watch::channel(0usize);
        let (reports, _) = broadcast::channel(256);

        Self {
            inner: Arc::new(Inner {
                sink,
                policy,
                state: Mutex::new(QueueState::default()),
                workers,
                workers_rx,
                reports,
            }),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// Queue `position` for `item_id`, replacing any position still waiting for
    /// that item. Returns immediately; must be called inside a Tokio runtime.
    pub fn enqueue(&self, item_id: impl Into<String>, position: Position) {
        let item_id = item_id.into();

        let start_worker = {
            let mut state = self.inner.lock();
            if state.pending.insert(item_id.clone(), position).is_some() {
                tracing::debug!("position for item {} superseded before it was sent", item_id);
            }
            state.latest.insert(item_id.clone(), position);

            let start = state.draining.insert(item_id.clone());
            if start {
                // Counted under the lock so a concurrent flush never sees zero with work queued.
                self.inner.workers.send_modify(|n| *n += 1);
            }
            start
        };

        if start_worker {
            tokio::spawn(Inner::drain(self.inner.clone(), item_id));
        }
    }

    /// Newest position queued or being written for `item_id`. Cleared once
    /// the item's queue drains, whether the last write was saved or failed.
    pub fn pending_position(&self, item_id: &str) -> Option<Position> {
        self.inner.lock().latest.get(item_id).copied()
    }

    /// Items with a write queued or in flight.
    pub fn in_flight(&self) -> usize {
        *self.inner.workers_rx.borrow()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PersistReport> {
        self.inner.reports.subscribe()
    }

    /// Wait until every queue has drained.
    pub async fn flush(&self) {
        let mut rx = self.inner.workers_rx.clone();
        // The sender lives in `inner`, so the channel cannot close while we hold `self`.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Like [`flush`](Self::flush) but gives up after `limit`. Returns whether everything drained.
    pub async fn flush_timeout(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.flush()).await.is_ok()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_newer(&self, item_id: &str) -> bool {
        self.lock().pending.contains_key(item_id)
    }

    async fn drain(inner: Arc<Inner>, item_id: String) {
        loop {
            let next = {
                let mut state = inner.lock();
                let next = state.pending.remove(&item_id);
                if next.is_none() {
                    state.draining.remove(&item_id);
                    state.latest.remove(&item_id);
                    inner.workers.send_modify(|n| *n = n.saturating_sub(1));
                }
                next
            };

            let Some(position) = next else {
                return;
            };

            let outcome = inner.deliver(&item_id, position).await;
            let _ = inner.reports.send(PersistReport {
                item_id: item_id.clone(),
                position,
                outcome,
            });
        }
    }

    async fn deliver(&self, item_id: &str, position: Position) -> PersistOutcome {
        let mut attempts = 0;

        loop {
            attempts += 1;
            let error = match self.sink.update_position(item_id, position).await {
                Ok(()) => {
                    tracing::debug!("saved position ({}, {}) for item {}", position.x, position.y, item_id);
                    return PersistOutcome::Saved { attempts };
                }
                Err(error) => error,
            };

            if !error.is_transient() || attempts >= self.policy.max_attempts {
                return self.give_up(item_id, attempts, error);
            }
            if self.has_newer(item_id) {
                return PersistOutcome::Superseded { attempts };
            }

            let delay = self.policy.delay_for(attempts);
            tracing::warn!(
                "position write for item {} failed (attempt {}/{}): {}; retrying in {:?}",
                item_id,
                attempts,
                self.policy.max_attempts,
                error,
                delay
            );
            tokio::time::sleep(delay).await;

            if self.has_newer(item_id) {
                return PersistOutcome::Superseded { attempts };
            }
        }
    }

    fn give_up(&self, item_id: &str, attempts: u32, error: StoreError) -> PersistOutcome {
        tracing::error!(
            "giving up on position write for item {} after {} attempt(s): {}",
            item_id,
            attempts,
            error
        );
        PersistOutcome::Failed {
            attempts,
            error: error.to_string(),
        }
    }
}
