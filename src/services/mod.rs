//! Orchestration layer: the registry catalog and the dispatcher loop. Both
//! depend only on `domain` ports/models and `infrastructure` adapters.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use registry::Registry;
