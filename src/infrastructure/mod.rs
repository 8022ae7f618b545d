//! Concrete adapters for the ports declared under `domain::ports`, plus
//! the id generator and ambient config/logging stack. No module here is
//! depended on by `domain`.

pub mod config;
pub mod id_generator;
pub mod logging;
pub mod snapshot_store;

pub use config::ConfigLoader;
pub use id_generator::IdGenerator;
pub use logging::LoggerImpl;
pub use snapshot_store::FileSnapshotStore;
