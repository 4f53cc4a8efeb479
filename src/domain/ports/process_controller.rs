//! Process Controller Port
//!
//! Starts and stops backend processes by title and port.

use crate::domain::entities::InstanceSpec;
use crate::domain::value_objects::CommandOutput;
use async_trait::async_trait;

/// A command could not be executed or its exit could not be observed.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Controls the lifecycle of backend processes.
///
/// Calls block until the underlying command exits. A non-zero exit is
/// reported through `CommandOutput`, not as an error; the caller decides
/// whether it matters.
#[async_trait]
pub trait ProcessController: Send + Sync {
    /// Stop the process carrying `instance.title`.
    async fn stop(&self, instance: &InstanceSpec) -> Result<CommandOutput, CommandError>;

    /// Start a process for `instance`, forwarding `args` to it.
    async fn start(
        &self,
        instance: &InstanceSpec,
        args: &[String],
    ) -> Result<CommandOutput, CommandError>;
}
