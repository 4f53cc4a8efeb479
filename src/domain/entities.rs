//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of a rolling deployment.
//! They have no external dependencies and contain only business logic.

use crate::domain::value_objects::BackendAddress;
use serde::{Deserialize, Serialize};

/// One backend process under management.
///
/// Instances are read from the deployment descriptor and never change
/// during a run. The title identifies the process to the process manager,
/// the port identifies it to the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Process title, unique across the deployment
    pub title: String,
    /// Port the instance listens on
    pub port: u16,
}

impl InstanceSpec {
    pub fn new(title: impl Into<String>, port: u16) -> Self {
        Self {
            title: title.into(),
            port,
        }
    }

    /// Address under which the proxy reaches this instance.
    pub fn address(&self) -> BackendAddress {
        BackendAddress::loopback(self.port)
    }
}

/// A server entry in the proxy's upstream pool.
///
/// The persisted pool is the single source of truth for what receives
/// traffic. A disabled backend stays in the file but gets no requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    /// `host:port` of the server
    pub address: BackendAddress,
    /// Whether the proxy routes traffic to this server
    pub enabled: bool,
}

impl Backend {
    pub fn new(address: BackendAddress, enabled: bool) -> Self {
        Self { address, enabled }
    }
}
