//! nginx Upstream Pool
//!
//! Implements UpstreamPool on top of an nginx config file.
//! The file is the only state; nothing is cached between calls.

use crate::adapters::outbound::nginx_conf;
use crate::domain::entities::Backend;
use crate::domain::ports::{PoolError, UpstreamPool};
use crate::domain::value_objects::BackendAddress;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, Semaphore};

/// Default bound on in-flight file operations.
pub const DEFAULT_MAX_CONCURRENCY: usize = 50;

/// File-backed upstream pool.
///
/// Every operation takes a permit from a bounded semaphore. Mutations
/// additionally hold a write lock across read-modify-write, so concurrent
/// edits from callers sharing this pool never overwrite each other.
/// Writes land in a temp file next to the resolved config (symlinks are
/// followed) that is renamed into place.
pub struct NginxUpstreamPool {
    conf_path: PathBuf,
    upstream: Option<String>,
    permits: Semaphore,
    write_lock: Mutex<()>,
}

impl NginxUpstreamPool {
    /// Create a pool over `conf_path`.
    ///
    /// `upstream` selects the block by name; `None` uses the first one.
    pub fn new(conf_path: impl Into<PathBuf>, upstream: Option<String>, max_concurrency: usize) -> Self {
        Self {
            conf_path: conf_path.into(),
            upstream,
            permits: Semaphore::new(max_concurrency.max(1)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn conf_path(&self) -> &Path {
        &self.conf_path
    }

    async fn read(&self) -> Result<String, PoolError> {
        Ok(tokio::fs::read_to_string(&self.conf_path).await?)
    }

    async fn write(&self, contents: &str) -> Result<(), PoolError> {
        // rename over a symlink would replace the link, not its target
        let target = tokio::fs::canonicalize(&self.conf_path).await?;
        let tmp = temp_path(&target);
        tokio::fs::write(&tmp, contents).await?;
        let meta = tokio::fs::metadata(&target).await?;
        tokio::fs::set_permissions(&tmp, meta.permissions()).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn mutate<F>(&self, edit: F) -> Result<(), PoolError>
    where
        F: FnOnce(&str, Option<&str>) -> Result<String, PoolError> + Send,
    {
        let _permit = self.permits.acquire().await.map_err(|_| PoolError::Closed)?;
        let _guard = self.write_lock.lock().await;

        let current = self.read().await?;
        let updated = edit(&current, self.upstream.as_deref())?;
        self.write(&updated).await
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".edge-deploy.tmp");
    path.with_file_name(name)
}

#[async_trait]
impl UpstreamPool for NginxUpstreamPool {
    async fn list_backends(&self) -> Result<Vec<Backend>, PoolError> {
        let _permit = self.permits.acquire().await.map_err(|_| PoolError::Closed)?;
        let text = self.read().await?;
        nginx_conf::list_servers(&text, self.upstream.as_deref())
    }

    async fn add_backend(&self, address: &BackendAddress) -> Result<(), PoolError> {
        self.mutate(|text, upstream| nginx_conf::add_server(text, upstream, address))
            .await?;
        tracing::debug!(%address, "backend added to {}", self.conf_path.display());
        Ok(())
    }

    async fn remove_backend(&self, address: &BackendAddress) -> Result<(), PoolError> {
        self.mutate(|text, upstream| nginx_conf::remove_server(text, upstream, address))
            .await?;
        tracing::debug!(%address, "backend removed from {}", self.conf_path.display());
        Ok(())
    }

    async fn toggle_backend(&self, address: &BackendAddress, enabled: bool) -> Result<(), PoolError> {
        self.mutate(|text, upstream| {
            nginx_conf::set_server_enabled(text, upstream, address, enabled)
        })
        .await?;
        tracing::debug!(%address, enabled, "backend toggled in {}", self.conf_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    const CONF: &str = "http {\n    upstream backend {\n    }\n}\n";

    fn setup(contents: &str) -> (TempDir, NginxUpstreamPool) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nginx.conf");
        std::fs::write(&path, contents).unwrap();
        let pool = NginxUpstreamPool::new(path, None, DEFAULT_MAX_CONCURRENCY);
        (dir, pool)
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let (_dir, pool) = setup(CONF);
        assert!(pool.list_backends().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        let (_dir, pool) = setup(CONF);
        let a = BackendAddress::loopback(7001);
        let b = BackendAddress::loopback(7002);

        pool.add_backend(&a).await.unwrap();
        pool.add_backend(&b).await.unwrap();
        let listed = pool.list_backends().await.unwrap();
        assert_eq!(
            listed,
            vec![Backend::new(a.clone(), true), Backend::new(b.clone(), true)]
        );

        pool.remove_backend(&a).await.unwrap();
        assert_eq!(pool.list_backends().await.unwrap(), vec![Backend::new(b, true)]);
    }

    #[tokio::test]
    async fn test_changes_persist_to_file() {
        let (_dir, pool) = setup(CONF);
        pool.add_backend(&BackendAddress::loopback(7001)).await.unwrap();

        let on_disk = std::fs::read_to_string(pool.conf_path()).unwrap();
        assert!(on_disk.contains("server localhost:7001;"));

        // a fresh pool over the same file sees the same membership
        let reopened = NginxUpstreamPool::new(pool.conf_path(), None, 1);
        assert_eq!(reopened.list_backends().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_add() {
        let (_dir, pool) = setup(CONF);
        let a = BackendAddress::loopback(7001);
        pool.add_backend(&a).await.unwrap();
        assert!(matches!(pool.add_backend(&a).await, Err(PoolError::AlreadyExists(_))));
        assert_eq!(pool.list_backends().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_missing() {
        let (_dir, pool) = setup(CONF);
        let result = pool.remove_backend(&BackendAddress::loopback(7001)).await;
        assert!(matches!(result, Err(PoolError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle() {
        let (_dir, pool) = setup(CONF);
        let a = BackendAddress::loopback(7001);
        pool.add_backend(&a).await.unwrap();

        pool.toggle_backend(&a, false).await.unwrap();
        assert!(!pool.list_backends().await.unwrap()[0].enabled);

        pool.toggle_backend(&a, true).await.unwrap();
        assert!(pool.list_backends().await.unwrap()[0].enabled);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let pool = NginxUpstreamPool::new(dir.path().join("absent.conf"), None, 1);
        assert!(matches!(pool.list_backends().await, Err(PoolError::Io(_))));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let (dir, pool) = setup(CONF);
        pool.add_backend(&BackendAddress::loopback(7001)).await.unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_through_symlink() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.conf");
        let link = dir.path().join("nginx.conf");
        std::fs::write(&real, CONF).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let pool = NginxUpstreamPool::new(&link, None, 1);
        pool.add_backend(&BackendAddress::loopback(7001)).await.unwrap();

        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(std::fs::read_to_string(&real)
            .unwrap()
            .contains("server localhost:7001;"));
        assert_eq!(pool.list_backends().await.unwrap().len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_are_not_lost() {
        let (_dir, pool) = setup(CONF);
        let pool = Arc::new(pool);

        let mut handles = Vec::new();
        for port in 8000..8040u16 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                pool.add_backend(&BackendAddress::loopback(port)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(pool.list_backends().await.unwrap().len(), 40);
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let tmp = temp_path(Path::new("/etc/nginx/nginx.conf"));
        assert_eq!(tmp, PathBuf::from("/etc/nginx/nginx.conf.edge-deploy.tmp"));
    }
}
