//! Static catalog entries: what a task kind's commands are, and how to
//! construct a fresh handler for a submitted instance.

use std::sync::Arc;

use crate::domain::errors::RegistrationError;
use crate::domain::models::config::AppConfig;
use crate::domain::models::ids::{CommandId, InstanceId};
use crate::domain::models::submit_request::SubmitRequest;
use crate::domain::ports::task_handler::{IsCancelled, TaskHandler};

/// Factory producing the empty JSON shape a command's snapshots take.
/// Must return a non-null value — `serde_json::Value::Null` fails
/// registration-time validation.
pub type NewSnapshotFn = Arc<dyn Fn() -> serde_json::Value + Send + Sync>;

/// Factory constructing the per-instance handler for a validated
/// submission. Receives the freshly allocated instance id so the
/// handler can correlate its own logging/events with it, and the same
/// `IsCancelled` predicate the worker will later pass to `execute` —
/// handlers that spawn their own sub-tasks can capture it at
/// construction instead of threading it through by hand.
pub type NewTaskFn = Arc<
    dyn Fn(&InstanceId, &SubmitRequest, &AppConfig, IsCancelled) -> Arc<dyn TaskHandler>
        + Send
        + Sync,
>;

/// One command a task kind supports.
#[derive(Clone)]
pub struct CommandConfig {
    pub id: CommandId,
    pub allow_multiple: bool,
    pub new_snapshot: NewSnapshotFn,
}

impl CommandConfig {
    pub fn new(id: CommandId, allow_multiple: bool, new_snapshot: NewSnapshotFn) -> Self {
        Self {
            id,
            allow_multiple,
            new_snapshot,
        }
    }
}

/// Everything the registry needs to know about one task kind.
#[derive(Clone)]
pub struct TaskKindConfig {
    pub commands: Vec<CommandConfig>,
    pub new_task: NewTaskFn,
}

impl TaskKindConfig {
    pub fn new(commands: Vec<CommandConfig>, new_task: NewTaskFn) -> Self {
        Self { commands, new_task }
    }

    /// Enforces the invariants the specification requires at
    /// registration time: non-empty commands, unique command ids within
    /// the kind, and every `new_snapshot` probing to a non-null value.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.commands.is_empty() {
            return Err(RegistrationError::InvalidConfig(
                "task kind must declare at least one command".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for command in &self.commands {
            if !seen.insert(command.id.as_str().to_string()) {
                return Err(RegistrationError::InvalidConfig(format!(
                    "duplicate command id {:?} within task kind",
                    command.id
                )));
            }

            if (command.new_snapshot)().is_null() {
                return Err(RegistrationError::InvalidConfig(format!(
                    "command {:?} new_snapshot factory returned null",
                    command.id
                )));
            }
        }

        Ok(())
    }

    /// First command whose id pattern matches `target`, in declaration
    /// order.
    pub fn find_command(&self, target: &CommandId) -> Option<&CommandConfig> {
        self.commands.iter().find(|c| c.id.matches(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler_factory() -> NewTaskFn {
        Arc::new(|_instance_id, _req, _cfg, _is_cancelled| -> Arc<dyn TaskHandler> {
            unimplemented!("not exercised in these tests")
        })
    }

    #[test]
    fn empty_commands_rejected() {
        let cfg = TaskKindConfig::new(vec![], handler_factory());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duplicate_command_ids_rejected() {
        let cfg = TaskKindConfig::new(
            vec![
                CommandConfig::new(
                    CommandId::new("watch").unwrap(),
                    false,
                    Arc::new(|| serde_json::json!({})),
                ),
                CommandConfig::new(
                    CommandId::new("watch").unwrap(),
                    true,
                    Arc::new(|| serde_json::json!({})),
                ),
            ],
            handler_factory(),
        );
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn null_snapshot_factory_rejected() {
        let cfg = TaskKindConfig::new(
            vec![CommandConfig::new(
                CommandId::new("watch").unwrap(),
                false,
                Arc::new(|| serde_json::Value::Null),
            )],
            handler_factory(),
        );
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn valid_config_passes() {
        let cfg = TaskKindConfig::new(
            vec![CommandConfig::new(
                CommandId::new("watch").unwrap(),
                false,
                Arc::new(|| serde_json::json!({})),
            )],
            handler_factory(),
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn find_command_respects_declaration_order_tiebreak() {
        let cfg = TaskKindConfig::new(
            vec![
                CommandConfig::new(
                    CommandId::new("a*").unwrap(),
                    false,
                    Arc::new(|| serde_json::json!({})),
                ),
                CommandConfig::new(
                    CommandId::new("ab").unwrap(),
                    false,
                    Arc::new(|| serde_json::json!({})),
                ),
            ],
            handler_factory(),
        );
        let found = cfg.find_command(&CommandId::new("ab").unwrap()).unwrap();
        assert_eq!(found.id.as_str(), "a*");
    }
}
