//! Outbound notification capability. Concrete transports (Telegram,
//! email, ...) live outside this crate; the dispatcher and workers only
//! ever depend on this trait.

use async_trait::async_trait;

use crate::domain::models::execution_context::ExecutionContext;
use crate::domain::models::ids::NotifierId;

/// Thread-safe notification sink. Both the dispatcher loop and worker
/// tasks call this concurrently, so implementations must be internally
/// synchronized.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Send `message` through the channel identified by `notifier_id`.
    /// Returns whether the send succeeded; failures are logged by the
    /// caller but never escalate into a `CoreError`, matching the
    /// "best-effort" notification policy of the specification.
    async fn notify(
        &self,
        ctx: &ExecutionContext,
        notifier_id: &NotifierId,
        message: &str,
    ) -> bool;

    /// Send `message` to the system default channel, used when a
    /// notifier id is unknown or unspecified (e.g. "unknown instance"
    /// cancellation replies).
    async fn notify_default(&self, message: &str) -> bool;

    /// Whether the channel identified by `notifier_id` can render HTML.
    async fn supports_html(&self, notifier_id: &NotifierId) -> bool;
}
