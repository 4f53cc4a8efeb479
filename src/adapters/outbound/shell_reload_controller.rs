//! Shell Reload Controller
//!
//! Implements ReloadController with configured proxy command lines.

use crate::adapters::outbound::ShellCommandRunner;
use crate::domain::ports::{CommandError, ReloadController};
use crate::domain::value_objects::CommandOutput;
use async_trait::async_trait;

pub const DEFAULT_RELOAD_COMMAND: &str = "nginx -s reload";
pub const DEFAULT_PROXY_START_COMMAND: &str = "service nginx start";

pub struct ShellReloadController {
    runner: ShellCommandRunner,
    reload_command: String,
    start_command: String,
}

impl ShellReloadController {
    pub fn new(
        runner: ShellCommandRunner,
        reload_command: impl Into<String>,
        start_command: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            reload_command: reload_command.into(),
            start_command: start_command.into(),
        }
    }
}

#[async_trait]
impl ReloadController for ShellReloadController {
    async fn reload(&self) -> Result<CommandOutput, CommandError> {
        self.runner.run(&self.reload_command).await
    }

    async fn start_proxy(&self) -> Result<CommandOutput, CommandError> {
        self.runner.run(&self.start_command).await
    }
}
