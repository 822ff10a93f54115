//! The configuration provider abstraction and its in-memory implementations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Resolves named integration settings.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Value stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> ConfigResult<Option<String>>;

    /// Value stored under `key`; absent or blank values are an error.
    async fn require(&self, key: &str) -> ConfigResult<String> {
        match self.get(key).await? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingKey {
                key: key.to_string(),
            }),
        }
    }

    /// Value stored under `key`, falling back to `default` when absent or blank.
    async fn get_or(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get(key)
            .await?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default.to_string()))
    }
}

#[async_trait]
impl<T: ConfigProvider + ?Sized> ConfigProvider for Arc<T> {
    async fn get(&self, key: &str) -> ConfigResult<Option<String>> {
        (**self).get(key).await
    }
}

/// Fixed set of values, for tests and local runs.
#[derive(Debug, Default)]
pub struct StaticConfig {
    values: RwLock<HashMap<String, String>>,
}

impl StaticConfig {
    /// Provider holding `values`.
    #[must_use]
    pub fn new<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }

    /// Set or replace a value.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().await.insert(key.into(), value.into());
    }
}

#[async_trait]
impl ConfigProvider for StaticConfig {
    async fn get(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }
}

/// Memoizes another provider's answers for a fixed time-to-live.
pub struct CachedConfig<P> {
    inner: P,
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, Option<String>)>>,
}

impl<P: ConfigProvider> CachedConfig<P> {
    /// Wrap `inner`, keeping answers for `ttl`.
    #[must_use]
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every cached answer.
    pub async fn invalidate(&self) {
        self.entries.write().await.clear();
        debug!("configuration cache invalidated");
    }
}

#[async_trait]
impl<P: ConfigProvider> ConfigProvider for CachedConfig<P> {
    async fn get(&self, key: &str) -> ConfigResult<Option<String>> {
        if let Some((stored_at, value)) = self.entries.read().await.get(key)
            && stored_at.elapsed() < self.ttl
        {
            return Ok(value.clone());
        }
        let value = self.inner.get(key).await?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (Instant::now(), value.clone()));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn require_rejects_missing_and_blank_values() {
        let config = StaticConfig::new([("present", "value"), ("blank", "  ")]);
        assert_eq!(config.require("present").await.unwrap(), "value");
        assert!(matches!(
            config.require("blank").await,
            Err(ConfigError::MissingKey { key }) if key == "blank"
        ));
        assert!(matches!(
            config.require("absent").await,
            Err(ConfigError::MissingKey { .. })
        ));
        assert_eq!(config.get_or("absent", "admin").await.unwrap(), "admin");
        assert_eq!(config.get_or("present", "admin").await.unwrap(), "value");
    }

    #[tokio::test(start_paused = true)]
    async fn cached_values_expire_after_ttl() {
        let inner = Arc::new(StaticConfig::new([("key", "one")]));
        let cached = CachedConfig::new(Arc::clone(&inner), Duration::from_secs(60));
        assert_eq!(cached.get("key").await.unwrap().as_deref(), Some("one"));

        inner.set("key", "two").await;
        assert_eq!(cached.get("key").await.unwrap().as_deref(), Some("one"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cached.get("key").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_lookup() {
        let inner = Arc::new(StaticConfig::default());
        let cached = CachedConfig::new(Arc::clone(&inner), Duration::from_secs(3600));
        assert_eq!(cached.get("key").await.unwrap(), None);

        inner.set("key", "late").await;
        assert_eq!(cached.get("key").await.unwrap(), None);
        cached.invalidate().await;
        assert_eq!(cached.get("key").await.unwrap().as_deref(), Some("late"));
    }
}
