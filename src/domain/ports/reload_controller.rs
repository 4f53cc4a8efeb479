//! Reload Controller Port
//!
//! Defines the interface for applying pool changes to the running proxy.

use crate::domain::ports::CommandError;
use crate::domain::value_objects::CommandOutput;
use async_trait::async_trait;

/// Issues reload and start commands to the reverse proxy.
#[async_trait]
pub trait ReloadController: Send + Sync {
    /// Ask the proxy to re-read its configuration.
    async fn reload(&self) -> Result<CommandOutput, CommandError>;

    /// Start the proxy when it is not running.
    async fn start_proxy(&self) -> Result<CommandOutput, CommandError>;
}
