//! A trivial, in-process task kind used to exercise the dispatcher without
//! any networking: it compares a monotonically increasing counter against
//! the last persisted value and reports a change whenever it advances.
//! Not part of the core's public API — registered by `main.rs` purely to
//! give the bootstrap binary something to run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use taskwarden::{CoreError, ExecuteOutcome, IsCancelled, TaskHandler};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HeartbeatSnapshot {
    pub tick: u64,
    pub last_seen_at: Option<String>,
}

pub struct HeartbeatTask {
    counter: Arc<AtomicU64>,
}

impl HeartbeatTask {
    pub fn new(counter: Arc<AtomicU64>) -> Self {
        Self { counter }
    }
}

#[async_trait]
impl TaskHandler for HeartbeatTask {
    async fn execute(
        &self,
        prior: serde_json::Value,
        _supports_html: bool,
        is_cancelled: IsCancelled,
    ) -> Result<ExecuteOutcome, CoreError> {
        let prior: HeartbeatSnapshot = serde_json::from_value(prior).unwrap_or_default();
        let tick = self.counter.fetch_add(1, Ordering::SeqCst);

        if tick == prior.tick {
            return Ok(ExecuteOutcome::unchanged());
        }

        if is_cancelled() {
            return Ok(ExecuteOutcome::unchanged());
        }

        let snapshot = HeartbeatSnapshot {
            tick,
            last_seen_at: Some(Utc::now().to_rfc3339()),
        };
        let message = format!("heartbeat advanced to tick {tick}");
        Ok(ExecuteOutcome::changed(
            message,
            serde_json::to_value(&snapshot)?,
        ))
    }
}
