//! The request a submitter hands to the dispatcher.

use crate::domain::errors::CoreError;
use crate::domain::models::execution_context::ExecutionContext;
use crate::domain::models::ids::{CommandId, NotifierId, TaskId};
use crate::domain::models::run_by::RunBy;

/// A request to run one instance of `(task_id, command_id)`.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub task_id: TaskId,
    pub command_id: CommandId,
    pub run_by: RunBy,
    pub notifier_id: Option<NotifierId>,
    pub notify_on_start: bool,
    pub context: Option<ExecutionContext>,
}

impl SubmitRequest {
    pub fn new(task_id: TaskId, command_id: CommandId, run_by: RunBy) -> Self {
        Self {
            task_id,
            command_id,
            run_by,
            notifier_id: None,
            notify_on_start: false,
            context: None,
        }
    }

    pub fn with_notifier_id(mut self, notifier_id: NotifierId) -> Self {
        self.notifier_id = Some(notifier_id);
        self
    }

    pub fn with_notify_on_start(mut self, notify_on_start: bool) -> Self {
        self.notify_on_start = notify_on_start;
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Field-presence validation only; registry lookup happens separately
    /// in the dispatcher.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.run_by.validate()?;
        Ok(())
    }
}
