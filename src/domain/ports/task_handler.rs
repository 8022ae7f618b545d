//! The contract every concrete task kind implements. The core only ever
//! sees this trait object — it never parses HTML or calls external URLs
//! itself, per the out-of-scope boundary in the specification.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::CoreError;

/// Cheap, thread-safe predicate backed by the dispatcher's per-instance
/// cancellation flag. Handlers poll it at natural intermediate points —
/// loop boundaries, between I/O calls — to cooperate with cancellation
/// instead of only being discarded once `execute` returns.
pub type IsCancelled = Arc<dyn Fn() -> bool + Send + Sync>;

/// Result of one `execute` call.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOutcome {
    /// Message to notify, if any. Empty means nothing to send.
    pub message: String,

    /// Replacement snapshot, if the run produced a change worth
    /// persisting. `None` leaves the prior snapshot untouched.
    pub new_snapshot: Option<serde_json::Value>,
}

impl ExecuteOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn changed(message: impl Into<String>, new_snapshot: serde_json::Value) -> Self {
        Self {
            message: message.into(),
            new_snapshot: Some(new_snapshot),
        }
    }

    /// A verbose report with no persisted change — only meaningful when
    /// `RunBy::User` requested one.
    pub fn verbose_report(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            new_snapshot: None,
        }
    }
}

/// Stateless per-instance execution body, constructed fresh by a
/// `TaskKindConfig::new_task` factory for every submission.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Compare `prior` (the snapshot loaded by the worker, or an empty
    /// shape if none existed or load failed) against freshly fetched
    /// data, returning a message to send and/or a new snapshot to
    /// persist. `supports_html` indicates whether the eventual notifier
    /// renders HTML, so kinds can choose a plain-text fallback.
    /// `is_cancelled` reports whether the instance has been cancelled;
    /// implementations doing multi-step work should check it between
    /// steps and return early (an empty [`ExecuteOutcome`] is fine —
    /// the dispatcher discards the result either way).
    async fn execute(
        &self,
        prior: serde_json::Value,
        supports_html: bool,
        is_cancelled: IsCancelled,
    ) -> Result<ExecuteOutcome, CoreError>;
}
