//! edge-deploy Library
//!
//! Zero-downtime rolling restarts of local backend instances behind an
//! nginx upstream pool. Exposed as a library for integration tests.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

// Re-export commonly used types
pub use adapters::outbound::{NginxUpstreamPool, ShellCommandRunner, ShellProcessController, ShellReloadController};
pub use application::{DeployError, DeployPhase, RollingRestartService, RunReport};
pub use config::{load_config, DeployConfig};
pub use domain::entities::{Backend, InstanceSpec};
pub use domain::ports::{ProcessController, ReloadController, UpstreamPool};
pub use domain::services::ReloadClassifier;
pub use domain::value_objects::BackendAddress;
