//! Shell Process Controller
//!
//! Implements ProcessController by rendering command templates and running
//! them through the shell.

use crate::adapters::outbound::ShellCommandRunner;
use crate::domain::entities::InstanceSpec;
use crate::domain::ports::{CommandError, ProcessController};
use crate::domain::value_objects::CommandOutput;
use async_trait::async_trait;

/// Default backend start template.
pub const DEFAULT_BACKEND_START: &str = "npx egg-scripts start {args} --title={title} --port={port}";

/// Default backend stop template.
pub const DEFAULT_BACKEND_STOP: &str = "npx egg-scripts stop --ignore-stderr --title={title}";

/// Substitute `{title}`, `{port}` and `{args}` in a command template.
///
/// Arguments are joined with single spaces and inserted verbatim.
pub fn render_template(template: &str, instance: &InstanceSpec, args: &[String]) -> String {
    template
        .replace("{title}", &instance.title)
        .replace("{port}", &instance.port.to_string())
        .replace("{args}", &args.join(" "))
}

/// Starts and stops backends with configurable shell command templates.
pub struct ShellProcessController {
    runner: ShellCommandRunner,
    start_template: String,
    stop_template: String,
}

impl ShellProcessController {
    pub fn new(
        runner: ShellCommandRunner,
        start_template: impl Into<String>,
        stop_template: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            start_template: start_template.into(),
            stop_template: stop_template.into(),
        }
    }
}

#[async_trait]
impl ProcessController for ShellProcessController {
    async fn stop(&self, instance: &InstanceSpec) -> Result<CommandOutput, CommandError> {
        let command = render_template(&self.stop_template, instance, &[]);
        self.runner.run(&command).await
    }

    async fn start(
        &self,
        instance: &InstanceSpec,
        args: &[String],
    ) -> Result<CommandOutput, CommandError> {
        let command = render_template(&self.start_template, instance, args);
        self.runner.run(&command).await
    }
}
