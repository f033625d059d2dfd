use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// Device local key-value storage used to persist the session between runs.
#[async_trait]
pub trait SecureStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a key that does not exist is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

pub type SecureStoreBox = Arc<dyn SecureStore>;
