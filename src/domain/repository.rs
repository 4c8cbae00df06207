use std::sync::Arc;

use async_trait::async_trait;

/// Durable key-value medium holding serialized state under named slots.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn init(&self) -> anyhow::Result<()>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn init(&self) -> anyhow::Result<()> { (**self).init().await }
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> { (**self).get(key).await }
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> { (**self).set(key, value).await }
}
