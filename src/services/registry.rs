//! Static catalog of task kinds, keyed by `TaskID`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::errors::{CoreError, RegistrationError};
use crate::domain::models::command_config::TaskKindConfig;
use crate::domain::models::ids::{CommandId, TaskId};

/// Outcome of a registry lookup miss, distinguished so the dispatcher can
/// notify with the right detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    TaskNotSupported,
    CommandNotSupported,
}

impl From<LookupError> for CoreError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::TaskNotSupported => {
                CoreError::InvalidInput("task kind not supported".into())
            }
            LookupError::CommandNotSupported => {
                CoreError::InvalidInput("command not supported for this task kind".into())
            }
        }
    }
}

/// Thread-safe catalog mapping `TaskID -> TaskKindConfig`.
///
/// Registration happens once at startup and aborts the process on any
/// invariant violation, mirroring the teacher's fail-fast convention for
/// startup-time configuration errors. Lookups are cheap, concurrent reads.
pub struct Registry {
    kinds: RwLock<HashMap<TaskId, TaskKindConfig>>,
    skip_validation: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            kinds: RwLock::new(HashMap::new()),
            skip_validation: false,
        }
    }

    /// Test-only constructor that bypasses `Validate` and duplicate-id
    /// checks. Never call this from production bootstrap code.
    pub fn new_for_tests_skip_validation() -> Self {
        Self {
            kinds: RwLock::new(HashMap::new()),
            skip_validation: true,
        }
    }

    /// Register `cfg` under `task_id`. Aborts the process on an invalid
    /// config or a duplicate id, unless constructed via
    /// [`Registry::new_for_tests_skip_validation`].
    pub fn register(&self, task_id: TaskId, cfg: TaskKindConfig) {
        if !self.skip_validation {
            if let Err(err) = cfg.validate() {
                panic!("registering task kind {task_id:?}: {err}");
            }
        }

        let mut kinds = self.kinds.write().expect("registry lock poisoned");
        if !self.skip_validation && kinds.contains_key(&task_id) {
            panic!(
                "{}",
                RegistrationError::DuplicateTaskId(task_id.as_str().to_string())
            );
        }
        kinds.insert(task_id, cfg);
    }

    /// Look up the command config registered for `(task_id, command_id)`.
    /// Returns both the owning kind's config and the matched command so
    /// the dispatcher can read `NewTask` and `AllowMultiple` in one call.
    pub fn lookup(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
    ) -> Result<(TaskKindConfig, crate::domain::models::command_config::CommandConfig), LookupError>
    {
        let kinds = self.kinds.read().expect("registry lock poisoned");
        let kind = kinds
            .get(task_id)
            .ok_or(LookupError::TaskNotSupported)?;
        let command = kind
            .find_command(command_id)
            .cloned()
            .ok_or(LookupError::CommandNotSupported)?;
        Ok((kind.clone(), command))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn trivial_config() -> TaskKindConfig {
        TaskKindConfig::new(
            vec![crate::domain::models::command_config::CommandConfig::new(
                CommandId::new("watch").unwrap(),
                false,
                Arc::new(|| serde_json::json!({})),
            )],
            Arc::new(|_instance_id, _req, _cfg, _is_cancelled| {
                unimplemented!("not exercised in these tests")
            }),
        )
    }

    #[test]
    fn lookup_missing_task_reports_task_not_supported() {
        let registry = Registry::new();
        let err = registry
            .lookup(&TaskId::new("NAVER").unwrap(), &CommandId::new("watch").unwrap())
            .unwrap_err();
        assert_eq!(err, LookupError::TaskNotSupported);
    }

    #[test]
    fn lookup_missing_command_reports_command_not_supported() {
        let registry = Registry::new();
        registry.register(TaskId::new("NAVER").unwrap(), trivial_config());
        let err = registry
            .lookup(&TaskId::new("NAVER").unwrap(), &CommandId::new("other").unwrap())
            .unwrap_err();
        assert_eq!(err, LookupError::CommandNotSupported);
    }

    #[test]
    fn lookup_after_register_succeeds() {
        let registry = Registry::new();
        registry.register(TaskId::new("NAVER").unwrap(), trivial_config());
        let (_, command) = registry
            .lookup(&TaskId::new("NAVER").unwrap(), &CommandId::new("watch").unwrap())
            .unwrap();
        assert_eq!(command.id.as_str(), "watch");
    }

    #[test]
    #[should_panic]
    fn duplicate_task_id_panics() {
        let registry = Registry::new();
        registry.register(TaskId::new("NAVER").unwrap(), trivial_config());
        registry.register(TaskId::new("NAVER").unwrap(), trivial_config());
    }

    #[test]
    #[should_panic]
    fn empty_commands_panics() {
        let registry = Registry::new();
        let cfg = TaskKindConfig::new(
            vec![],
            Arc::new(|_instance_id, _req, _cfg, _is_cancelled| unimplemented!()),
        );
        registry.register(TaskId::new("NAVER").unwrap(), cfg);
    }

    #[test]
    fn skip_validation_bypass_allows_duplicates() {
        let registry = Registry::new_for_tests_skip_validation();
        registry.register(TaskId::new("NAVER").unwrap(), trivial_config());
        registry.register(TaskId::new("NAVER").unwrap(), trivial_config());
        assert!(registry
            .lookup(&TaskId::new("NAVER").unwrap(), &CommandId::new("watch").unwrap())
            .is_ok());
    }
}
