//! Immutable, chainable metadata carrier for the notification pipeline.
//!
//! Modeled as two composed parts, per the teacher's pattern of splitting
//! cross-cutting concerns into independently testable pieces (see
//! `services::event_bus`'s envelope/payload split): an append-only
//! metadata chain (`MetadataNode`) and a standard cancellable/deadline
//! signal (`tokio_util::sync::CancellationToken`). `With*` derivations
//! clone the `Arc` chain and push one new node; they never mutate a
//! parent, so concurrent derivations from the same base never interfere.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::domain::models::ids::{CommandId, InstanceId, TaskId};

#[derive(Debug, Clone)]
enum Binding {
    Task(TaskId),
    Command(CommandId),
    Instance(InstanceId),
    Title(String),
    ErrorOccurred(bool),
    ElapsedSecondsAtRun(f64),
}

#[derive(Debug)]
enum MetadataNode {
    Root,
    Entry {
        parent: Arc<MetadataNode>,
        binding: Binding,
    },
}

impl MetadataNode {
    fn push(parent: &Arc<Self>, binding: Binding) -> Arc<Self> {
        Arc::new(Self::Entry {
            parent: parent.clone(),
            binding,
        })
    }

    fn find_task(&self) -> Option<&TaskId> {
        match self {
            Self::Root => None,
            Self::Entry { binding: Binding::Task(v), .. } => Some(v),
            Self::Entry { parent, .. } => parent.find_task(),
        }
    }

    fn find_command(&self) -> Option<&CommandId> {
        match self {
            Self::Root => None,
            Self::Entry { binding: Binding::Command(v), .. } => Some(v),
            Self::Entry { parent, .. } => parent.find_command(),
        }
    }

    fn find_instance(&self) -> Option<&InstanceId> {
        match self {
            Self::Root => None,
            Self::Entry { binding: Binding::Instance(v), .. } => Some(v),
            Self::Entry { parent, .. } => parent.find_instance(),
        }
    }

    fn find_title(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Entry { binding: Binding::Title(v), .. } => Some(v.as_str()),
            Self::Entry { parent, .. } => parent.find_title(),
        }
    }

    fn find_error(&self) -> Option<bool> {
        match self {
            Self::Root => None,
            Self::Entry { binding: Binding::ErrorOccurred(v), .. } => Some(*v),
            Self::Entry { parent, .. } => parent.find_error(),
        }
    }

    fn find_elapsed(&self) -> Option<f64> {
        match self {
            Self::Root => None,
            Self::Entry { binding: Binding::ElapsedSecondsAtRun(v), .. } => Some(*v),
            Self::Entry { parent, .. } => parent.find_elapsed(),
        }
    }
}

/// Reason an `ExecutionContext`'s signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    Cancelled,
    DeadlineExceeded,
}

/// Immutable metadata carrier plus a standard cancellable/deadline signal.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    metadata: Arc<MetadataNode>,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// A fresh, empty, never-cancelled context.
    pub fn new() -> Self {
        Self {
            metadata: Arc::new(MetadataNode::Root),
            cancellation: CancellationToken::new(),
            deadline: None,
        }
    }

    fn derive(&self, binding: Binding) -> Self {
        Self {
            metadata: MetadataNode::push(&self.metadata, binding),
            cancellation: self.cancellation.clone(),
            deadline: self.deadline,
        }
    }

    pub fn with_task(&self, task_id: TaskId, command_id: CommandId) -> Self {
        self.derive(Binding::Command(command_id)).derive(Binding::Task(task_id))
    }

    pub fn with_title(&self, title: impl Into<String>) -> Self {
        self.derive(Binding::Title(title.into()))
    }

    pub fn with_error(&self, occurred: bool) -> Self {
        self.derive(Binding::ErrorOccurred(occurred))
    }

    pub fn with_instance_id(&self, instance_id: InstanceId, elapsed: Duration) -> Self {
        self.derive(Binding::Instance(instance_id))
            .derive(Binding::ElapsedSecondsAtRun(elapsed.as_secs_f64()))
    }

    /// Derive a context whose cancellation cascades from this one but can
    /// also be cancelled independently (cancelling the child never
    /// cancels `self`). Metadata bindings are untouched.
    pub fn child_with_cancel(&self) -> (Self, CancellationToken) {
        let child_token = self.cancellation.child_token();
        let ctx = Self {
            metadata: self.metadata.clone(),
            cancellation: child_token.clone(),
            deadline: self.deadline,
        };
        (ctx, child_token)
    }

    /// Derive a context that cancels itself once `deadline` elapses.
    /// Cancelling `self` still cascades into the derived context.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let child_token = self.cancellation.child_token();
        let cancel_at_deadline = child_token.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            cancel_at_deadline.cancel();
        });
        Self {
            metadata: self.metadata.clone(),
            cancellation: child_token,
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn done(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn err(&self) -> Option<ContextError> {
        if !self.cancellation.is_cancelled() {
            return None;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => Some(ContextError::Cancelled),
        }
    }

    pub fn get_task_id(&self) -> Option<&TaskId> {
        self.metadata.find_task()
    }

    pub fn get_command_id(&self) -> Option<&CommandId> {
        self.metadata.find_command()
    }

    pub fn get_instance_id(&self) -> Option<&InstanceId> {
        self.metadata.find_instance()
    }

    pub fn get_title(&self) -> String {
        self.metadata.find_title().unwrap_or_default().to_string()
    }

    pub fn is_error_occurred(&self) -> bool {
        self.metadata.find_error().unwrap_or(false)
    }

    pub fn elapsed_seconds_at_run(&self) -> f64 {
        self.metadata.find_elapsed().unwrap_or(0.0)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_title_does_not_mutate_parent() {
        let base = ExecutionContext::new();
        let with_a = base.with_title("A");
        let with_b = base.with_title("B");

        assert_eq!(base.get_title(), "");
        assert_eq!(with_a.get_title(), "A");
        assert_eq!(with_b.get_title(), "B");
    }

    #[test]
    fn unbound_accessors_return_zero_value() {
        let ctx = ExecutionContext::new();
        assert_eq!(ctx.get_title(), "");
        assert!(!ctx.is_error_occurred());
        assert!(ctx.get_task_id().is_none());
        assert!((ctx.elapsed_seconds_at_run() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn chained_withs_compose() {
        let ctx = ExecutionContext::new()
            .with_title("first")
            .with_error(true)
            .with_title("second");

        assert_eq!(ctx.get_title(), "second");
        assert!(ctx.is_error_occurred());
    }

    #[tokio::test]
    async fn concurrent_derivations_are_independent() {
        let base = Arc::new(ExecutionContext::new());
        let b1 = base.clone();
        let b2 = base.clone();

        let (a, b) = tokio::join!(
            tokio::spawn(async move { b1.with_title("A") }),
            tokio::spawn(async move { b2.with_title("B") }),
        );

        assert_eq!(a.unwrap().get_title(), "A");
        assert_eq!(b.unwrap().get_title(), "B");
        assert_eq!(base.get_title(), "");
    }

    #[tokio::test]
    async fn child_cancel_does_not_cancel_parent() {
        let parent = ExecutionContext::new();
        let (child, token) = parent.child_with_cancel();
        token.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn parent_cancel_cascades_to_child() {
        let parent = ExecutionContext::new();
        let (child, _token) = parent.child_with_cancel();
        parent.cancellation.cancel();

        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn metadata_survives_cancellation_wrapping() {
        let base = ExecutionContext::new().with_title("kept");
        let (wrapped, token) = base.child_with_cancel();
        token.cancel();

        assert!(wrapped.is_cancelled());
        assert_eq!(wrapped.get_title(), "kept");
    }
}
