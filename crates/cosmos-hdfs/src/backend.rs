use async_trait::async_trait;
use std::sync::Arc;

use crate::error::BackendError;

/// Capability set over a remote hierarchical file store.
///
/// Keys and paths are relative to the backend's dataset directory; an
/// empty path names the dataset directory itself. Lines are passed without
/// a trailing newline, the backend terminates them.
///
/// `exists` followed by `create_file` or `append` is a check-then-act
/// sequence. Callers must own a key exclusively; no locking is provided.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, BackendError>;

    async fn create_dir(&self, path: &str) -> Result<(), BackendError>;

    /// Creates `key` holding a single line.
    async fn create_file(&self, key: &str, initial_line: &str) -> Result<(), BackendError>;

    /// Appends one line to an existing `key`.
    async fn append(&self, key: &str, line: &str) -> Result<(), BackendError>;
}

#[async_trait]
impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        (**self).exists(key).await
    }

    async fn create_dir(&self, path: &str) -> Result<(), BackendError> {
        (**self).create_dir(path).await
    }

    async fn create_file(&self, key: &str, initial_line: &str) -> Result<(), BackendError> {
        (**self).create_file(key, initial_line).await
    }

    async fn append(&self, key: &str, line: &str) -> Result<(), BackendError> {
        (**self).append(key, line).await
    }
}
