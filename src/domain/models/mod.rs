pub mod command_config;
pub mod config;
pub mod execution_context;
pub mod ids;
pub mod run_by;
pub mod submit_request;

pub use command_config::{CommandConfig, NewSnapshotFn, NewTaskFn, TaskKindConfig};
pub use config::AppConfig;
pub use execution_context::{ContextError, ExecutionContext};
pub use ids::{CommandId, InstanceId, NotifierId, TaskId};
pub use run_by::RunBy;
pub use submit_request::SubmitRequest;
