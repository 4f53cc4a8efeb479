//! Rolling Restart Service - Main application use case
//!
//! Restarts backend instances one at a time behind the proxy so that all
//! but one instance keep serving traffic throughout the deployment.

use crate::domain::entities::InstanceSpec;
use crate::domain::ports::{CommandError, PoolError, ProcessController, ReloadController, UpstreamPool};
use crate::domain::services::ReloadClassifier;
use crate::domain::value_objects::ReloadFailureKind;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Where a deployment run currently is.
///
/// There is no aborted variant: an aborted run is a `DeployError`, whose
/// `phase()` names the phase it stopped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    /// Populating an empty pool from the configured instances
    Bootstrapping,
    /// Restarting the instance at `index` in configured order
    Cycling { index: usize },
    /// Every instance has been restarted
    Done,
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrapping => f.write_str("bootstrap"),
            Self::Cycling { index } => write!(f, "cycle #{}", index + 1),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Fatal conditions. Each one aborts the run in the phase it names; proxy
/// state already changed is left as is.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("failed to read upstream pool during {phase}: {source}")]
    Pool {
        phase: DeployPhase,
        #[source]
        source: PoolError,
    },
    #[error("proxy reload failed during {phase} (exit code {code:?}): {}", .stderr.trim())]
    ReloadFailed {
        phase: DeployPhase,
        code: Option<i32>,
        stderr: String,
    },
    #[error("proxy reload could not run during {phase}: {source}")]
    ReloadSpawn {
        phase: DeployPhase,
        #[source]
        source: CommandError,
    },
    #[error("start instance {title} failed (exit code {code:?}), please check errors and fix it")]
    BackendStartFailed {
        phase: DeployPhase,
        title: String,
        code: Option<i32>,
    },
    #[error("start instance {title} could not run: {source}")]
    BackendStartSpawn {
        phase: DeployPhase,
        title: String,
        #[source]
        source: CommandError,
    },
}

impl DeployError {
    /// Phase in which the run was aborted. Returning this error is how a run
    /// reaches its aborted terminal state.
    pub fn phase(&self) -> DeployPhase {
        match self {
            Self::Pool { phase, .. }
            | Self::ReloadFailed { phase, .. }
            | Self::ReloadSpawn { phase, .. }
            | Self::BackendStartFailed { phase, .. }
            | Self::BackendStartSpawn { phase, .. } => *phase,
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Whether the pool was empty and got populated first
    pub bootstrapped: bool,
    /// Number of instances restarted
    pub restarted: usize,
}

/// Rolling restart use case.
///
/// This service sequences the ports for a deployment:
/// 1. Bootstraps an empty upstream pool
/// 2. For each instance in order: pull it from the pool, reload, drain,
///    restart the process, put it back, reload
///
/// Every port call is awaited before the next one starts. At most one
/// instance is out of the pool at any time.
pub struct RollingRestartService {
    pool: Arc<dyn UpstreamPool>,
    processes: Arc<dyn ProcessController>,
    proxy: Arc<dyn ReloadController>,
    classifier: ReloadClassifier,
    instances: Vec<InstanceSpec>,
    wait_stop: Duration,
}

impl RollingRestartService {
    pub fn new(
        pool: Arc<dyn UpstreamPool>,
        processes: Arc<dyn ProcessController>,
        proxy: Arc<dyn ReloadController>,
        classifier: ReloadClassifier,
        instances: Vec<InstanceSpec>,
        wait_stop: Duration,
    ) -> Self {
        Self {
            pool,
            processes,
            proxy,
            classifier,
            instances,
            wait_stop,
        }
    }

    /// Run a full rolling restart.
    ///
    /// `args` are forwarded to every backend start command.
    pub async fn start(&self, args: &[String]) -> Result<RunReport, DeployError> {
        let bootstrapped = self.bootstrap().await?;

        for (index, instance) in self.instances.iter().enumerate() {
            self.restart_instance(DeployPhase::Cycling { index }, instance, args)
                .await?;
        }

        tracing::info!(
            phase = %DeployPhase::Done,
            instances = self.instances.len(),
            "rolling restart complete"
        );
        Ok(RunReport {
            bootstrapped,
            restarted: self.instances.len(),
        })
    }

    /// Populate the pool on a first deployment.
    ///
    /// Only fires when the pool is empty, so repeated runs never add
    /// duplicates. A failed add is logged and skipped; the per-instance
    /// cycle adds each instance again later. Returns whether anything was
    /// added.
    pub async fn bootstrap(&self) -> Result<bool, DeployError> {
        let phase = DeployPhase::Bootstrapping;
        let backends = self
            .pool
            .list_backends()
            .await
            .map_err(|source| DeployError::Pool { phase, source })?;

        if !backends.is_empty() {
            tracing::debug!(backends = backends.len(), "upstream pool already populated");
            return Ok(false);
        }

        tracing::info!(%phase, "initializing, appending all upstream backends");
        let mut added = 0;
        for instance in &self.instances {
            let address = instance.address();
            match self.pool.add_backend(&address).await {
                Ok(()) => added += 1,
                Err(e) => tracing::warn!(
                    title = %instance.title,
                    %address,
                    error = %e,
                    "failed to add backend, skipping"
                ),
            }
        }

        if added > 0 {
            self.reload(phase).await?;
        }
        Ok(added > 0)
    }

    /// Reload the proxy.
    ///
    /// A failure carrying the not-running signature starts the proxy
    /// instead; the start's own outcome is logged but not checked. Any
    /// other failure is fatal.
    pub async fn reload(&self, phase: DeployPhase) -> Result<(), DeployError> {
        let output = self
            .proxy
            .reload()
            .await
            .map_err(|source| DeployError::ReloadSpawn { phase, source })?;

        if output.success() {
            tracing::info!(%phase, "proxy reloaded");
            return Ok(());
        }

        match self.classifier.classify(&output.stderr) {
            ReloadFailureKind::NotRunning => {
                tracing::info!(%phase, "proxy is not started, trying to start it");
                match self.proxy.start_proxy().await {
                    Ok(start) if start.success() => tracing::info!(%phase, "proxy started"),
                    Ok(start) => tracing::warn!(
                        %phase,
                        code = ?start.code,
                        "proxy start exited non-zero, continuing"
                    ),
                    Err(e) => tracing::warn!(%phase, error = %e, "proxy start could not run, continuing"),
                }
                Ok(())
            }
            ReloadFailureKind::Other => {
                tracing::error!(%phase, code = ?output.code, "proxy reload failed");
                Err(DeployError::ReloadFailed {
                    phase,
                    code: output.code,
                    stderr: output.stderr,
                })
            }
        }
    }

    async fn restart_instance(
        &self,
        phase: DeployPhase,
        instance: &InstanceSpec,
        args: &[String],
    ) -> Result<(), DeployError> {
        let title = instance.title.as_str();
        let address = instance.address();

        // 1-2. take the instance out of rotation
        tracing::info!(%phase, title, %address, "removing backend from upstream pool");
        match self.pool.remove_backend(&address).await {
            Ok(()) => {}
            Err(PoolError::NotFound(_)) => {
                tracing::warn!(%phase, title, "instance not found in upstream pool, ignoring")
            }
            Err(e) => tracing::warn!(%phase, title, error = %e, "failed to remove backend, continuing"),
        }
        self.reload(phase).await?;

        // 3-4. drain, then stop
        tracing::info!(
            %phase,
            title,
            wait_ms = self.wait_stop.as_millis() as u64,
            "waiting before stopping backend"
        );
        tokio::time::sleep(self.wait_stop).await;
        self.stop_instance(instance).await;

        // 5. start; a backend that does not come up is fatal
        tracing::info!(%phase, title, port = instance.port, "starting backend");
        let output = self
            .processes
            .start(instance, args)
            .await
            .map_err(|source| DeployError::BackendStartSpawn {
                phase,
                title: title.to_string(),
                source,
            })?;
        if !output.success() {
            tracing::error!(%phase, title, code = ?output.code, "backend failed to start");
            return Err(DeployError::BackendStartFailed {
                phase,
                title: title.to_string(),
                code: output.code,
            });
        }

        // 6-7. back into rotation
        if let Err(e) = self.pool.add_backend(&address).await {
            tracing::warn!(%phase, title, error = %e, "failed to add backend, continuing");
        }
        self.reload(phase).await?;

        tracing::info!(%phase, title, "instance reload done");
        Ok(())
    }

    /// Stop one instance. The outcome is deliberately not checked.
    async fn stop_instance(&self, instance: &InstanceSpec) {
        let title = instance.title.as_str();
        match self.processes.stop(instance).await {
            Ok(output) if output.success() => tracing::debug!(title, "backend stopped"),
            Ok(output) => tracing::warn!(title, code = ?output.code, "backend stop exited non-zero, ignoring"),
            Err(e) => tracing::warn!(title, error = %e, "backend stop could not run, ignoring"),
        }
    }

    /// Stop every configured instance. The proxy is not touched.
    pub async fn stop_all(&self) {
        for instance in &self.instances {
            tracing::info!(title = %instance.title, "stopping backend");
            self.stop_instance(instance).await;
        }
    }
}
