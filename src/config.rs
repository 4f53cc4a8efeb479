use crate::adapters::outbound::{
    DEFAULT_BACKEND_START, DEFAULT_BACKEND_STOP, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_PROXY_START_COMMAND, DEFAULT_RELOAD_COMMAND,
};
use crate::domain::entities::InstanceSpec;
use crate::domain::services::DEFAULT_NOT_RUNNING_SIGNATURE;
use serde::Deserialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Descriptor looked up in the working directory when none is given.
pub const DEFAULT_DESCRIPTOR: &str = ".deploy.yml";

/// Environment variable naming the descriptor path.
pub const DESCRIPTOR_ENV: &str = "EDGE_DEPLOY_CONFIG";

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployConfig {
    // Instances, restarted in this order
    pub instances: Vec<InstanceSpec>,

    // Proxy commands
    pub start_command: String,
    pub reload_command: String,
    pub proxy_binary: String,
    pub not_running_signature: String,

    // Upstream pool
    #[serde(alias = "nginxConfPath")]
    pub proxy_config_path: PathBuf,
    pub upstream_name: Option<String>,
    pub pool_concurrency: usize,

    // Backend commands
    pub backend_start_command: String,
    pub backend_stop_command: String,
    #[serde(alias = "waitStopTime")]
    pub wait_stop_time_ms: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            start_command: DEFAULT_PROXY_START_COMMAND.to_string(),
            reload_command: DEFAULT_RELOAD_COMMAND.to_string(),
            proxy_binary: "nginx".to_string(),
            not_running_signature: DEFAULT_NOT_RUNNING_SIGNATURE.to_string(),
            proxy_config_path: PathBuf::from("nginx.conf"),
            upstream_name: None,
            pool_concurrency: DEFAULT_MAX_CONCURRENCY,
            backend_start_command: DEFAULT_BACKEND_START.to_string(),
            backend_stop_command: DEFAULT_BACKEND_STOP.to_string(),
            wait_stop_time_ms: 5000,
        }
    }
}

impl DeployConfig {
    pub fn wait_stop_time(&self) -> Duration {
        Duration::from_millis(self.wait_stop_time_ms)
    }

    /// Check the instance list.
    ///
    /// A rolling restart of fewer than two instances cannot keep anything
    /// serving, so it is rejected here rather than at run time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.instances.len() {
            0 => return Err(ConfigError::NoInstances),
            1 => return Err(ConfigError::TooFewInstances(1)),
            _ => {}
        }

        let mut titles = HashSet::new();
        for instance in &self.instances {
            if instance.title.trim().is_empty() {
                return Err(ConfigError::EmptyTitle);
            }
            if instance.port == 0 {
                return Err(ConfigError::InvalidPort(instance.title.clone()));
            }
            if !titles.insert(instance.title.as_str()) {
                return Err(ConfigError::DuplicateTitle(instance.title.clone()));
            }
        }
        Ok(())
    }

    /// Check that the proxy config exists and the proxy binary is on PATH.
    pub fn check_environment(&self) -> Result<(), ConfigError> {
        if !self.proxy_config_path.exists() {
            return Err(ConfigError::ProxyConfigNotFound(self.proxy_config_path.clone()));
        }
        if which::which(&self.proxy_binary).is_err() {
            return Err(ConfigError::ProxyBinaryNotFound(self.proxy_binary.clone()));
        }
        Ok(())
    }
}

/// Configuration errors. All of them abort before any state is touched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{} not found", .0.display())]
    DescriptorNotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid deployment descriptor: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("proxy config {} not found", .0.display())]
    ProxyConfigNotFound(PathBuf),
    #[error("no instances found")]
    NoInstances,
    #[error("at least two instances are needed, found {0}")]
    TooFewInstances(usize),
    #[error("instance title must not be empty")]
    EmptyTitle,
    #[error("duplicate instance title {0:?}")]
    DuplicateTitle(String),
    #[error("instance {0:?} has invalid port 0")]
    InvalidPort(String),
    #[error("{0} not found in PATH")]
    ProxyBinaryNotFound(String),
}

/// Pick the descriptor path: explicit flag, then environment, then default.
pub fn descriptor_path(explicit: Option<PathBuf>) -> PathBuf {
    resolve_descriptor_path(explicit, std::env::var_os(DESCRIPTOR_ENV))
}

fn resolve_descriptor_path(explicit: Option<PathBuf>, from_env: Option<OsString>) -> PathBuf {
    explicit
        .or_else(|| from_env.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DESCRIPTOR))
}

/// Parse descriptor contents. An empty document yields the defaults.
pub fn parse_config(contents: &str) -> Result<DeployConfig, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(DeployConfig::default());
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// Load, resolve and fully validate the descriptor at `path`.
///
/// A relative `proxyConfigPath` is resolved against the descriptor's
/// directory.
pub fn load_config(path: &Path) -> Result<DeployConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::DescriptorNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut cfg = parse_config(&contents)?;
    if cfg.proxy_config_path.is_relative() {
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        cfg.proxy_config_path = base.join(&cfg.proxy_config_path);
    }

    cfg.validate()?;
    cfg.check_environment()?;

    Ok(cfg)
}
