//! Minimal stdout-backed `NotificationSender`, standing in for a real
//! transport (Telegram, email, ...) which is out of this crate's scope.

use async_trait::async_trait;

use taskwarden::{ExecutionContext, NotificationSender, NotifierId};

pub struct ConsoleNotifier;

#[async_trait]
impl NotificationSender for ConsoleNotifier {
    async fn notify(&self, ctx: &ExecutionContext, notifier_id: &NotifierId, message: &str) -> bool {
        println!("[{notifier_id}] {}: {message}", ctx.get_title());
        true
    }

    async fn notify_default(&self, message: &str) -> bool {
        println!("[default] {message}");
        true
    }

    async fn supports_html(&self, _notifier_id: &NotifierId) -> bool {
        false
    }
}
