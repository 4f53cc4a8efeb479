//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host name every managed backend listens on.
pub const LOOPBACK_HOST: &str = "localhost";

/// Proxy-facing address of a backend (`host:port`).
///
/// The address is the identity of a backend inside an upstream pool:
/// two entries with the same address are the same backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendAddress(String);

impl BackendAddress {
    /// Wrap an address exactly as it appears in the proxy config.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Address of a locally running instance listening on `port`.
    ///
    /// # Examples
    /// ```
    /// use edge_deploy::domain::value_objects::BackendAddress;
    ///
    /// assert_eq!(BackendAddress::loopback(7001).as_str(), "localhost:7001");
    /// ```
    pub fn loopback(port: u16) -> Self {
        Self(format!("{}:{}", LOOPBACK_HOST, port))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of running an external command to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or None when the process was killed by a signal
    pub code: Option<i32>,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stderr: stderr.into(),
        }
    }

    /// Exit status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Why a proxy reload command failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadFailureKind {
    /// The proxy master process is not running; starting it recovers.
    NotRunning,
    /// Any other failure. Fatal for the deployment.
    Other,
}
