//! Shell Command Runner
//!
//! Runs command lines through `sh -c`, waiting for the shell to exit and
//! capturing stderr so callers can inspect it.

use crate::domain::ports::CommandError;
use crate::domain::value_objects::CommandOutput;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};
use tokio::sync::mpsc;

/// How long stderr is drained after the shell exits. Backgrounded children
/// inherit the pipe and may hold it open indefinitely.
const STDERR_GRACE: Duration = Duration::from_millis(200);

/// Executes command strings with the system shell.
///
/// Child stdout goes straight to this process's stdout. Child stderr is
/// forwarded as it arrives and also collected for the caller.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
}

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    /// Use a different shell binary (must accept `-c <command>`).
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub async fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        tracing::debug!(command, "exec");

        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(pipe) = child.stderr.take() {
            tokio::spawn(forward_stderr(pipe, tx));
        }

        let status = child.wait().await.map_err(|source| CommandError::Wait {
            command: command.to_string(),
            source,
        })?;

        let mut stderr = Vec::new();
        let grace = tokio::time::sleep(STDERR_GRACE);
        tokio::pin!(grace);
        loop {
            tokio::select! {
                biased;
                chunk = rx.recv() => match chunk {
                    Some(chunk) => stderr.extend_from_slice(&chunk),
                    None => break,
                },
                _ = &mut grace => {
                    tracing::debug!(command, "stderr still open after exit, not waiting for it");
                    break;
                }
            }
        }

        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        let code = status.code();
        tracing::debug!(command, ?code, "exited");
        Ok(CommandOutput::new(code, stderr))
    }
}

/// Copy the child's stderr to ours until the pipe closes, handing each
/// chunk to the collector while it is still listening.
async fn forward_stderr(mut pipe: ChildStderr, tx: mpsc::UnboundedSender<Vec<u8>>) {
    let mut buf = [0u8; 4096];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let _ = std::io::stderr().write_all(&buf[..n]);
                let _ = tx.send(buf[..n].to_vec());
            }
        }
    }
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}
