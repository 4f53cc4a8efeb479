//! Upstream Pool Port
//!
//! Defines the interface for reading and mutating the proxy's backend set.
//! Implementations may edit an nginx config file or keep the set in memory.

use crate::domain::entities::Backend;
use crate::domain::value_objects::BackendAddress;
use async_trait::async_trait;

/// Errors reported by an upstream pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("upstream block {0:?} not found")]
    UpstreamNotFound(String),
    #[error("backend {0} already exists")]
    AlreadyExists(BackendAddress),
    #[error("backend {0} not found")]
    NotFound(BackendAddress),
    #[error("malformed proxy config: {0}")]
    Malformed(String),
    #[error("proxy config i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("upstream pool is closed")]
    Closed,
}

/// The proxy's set of backends for one upstream block.
///
/// This is an outbound port. Every mutation is atomic with respect to the
/// underlying storage, but no ordering is promised between concurrent
/// callers; a caller that needs sequencing awaits each call in turn.
#[async_trait]
pub trait UpstreamPool: Send + Sync {
    /// Current membership, enabled or not, in file order.
    async fn list_backends(&self) -> Result<Vec<Backend>, PoolError>;

    /// Append an enabled backend. Fails with `AlreadyExists` on a duplicate.
    async fn add_backend(&self, address: &BackendAddress) -> Result<(), PoolError>;

    /// Remove a backend. Fails with `NotFound` when absent.
    async fn remove_backend(&self, address: &BackendAddress) -> Result<(), PoolError>;

    /// Enable or disable a backend without removing it.
    async fn toggle_backend(&self, address: &BackendAddress, enabled: bool)
        -> Result<(), PoolError>;
}
