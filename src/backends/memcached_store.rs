//! Memcached Store - Distributed Remote Backend
//!
//! Memcached-backed remote tier. The `memcache` client is blocking, so each
//! command runs on tokio's blocking pool.

use anyhow::{Result, anyhow};
use memcache::MemcacheError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Memcached distributed store
///
/// This is the production remote tier, providing:
/// - Distributed caching across processes and hosts
/// - Native atomic `add`, `incr` and `decr`
/// - LRU eviction, which eventually reclaims keys orphaned by flush
///   generation rotation
pub struct MemcachedStore {
    /// Memcached client
    client: Arc<memcache::Client>,
}

impl MemcachedStore {
    /// Create new Memcached store
    ///
    /// # Configuration
    ///
    /// Uses `MEMCACHED_URL` environment variable or defaults to `memcache://127.0.0.1:11211`
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tiered_object_cache::backends::MemcachedStore;
    /// # fn example() -> anyhow::Result<()> {
    /// let store = MemcachedStore::new()?;
    /// # Ok(())
    /// # }
    /// ```
    /// # Errors
    ///
    /// Returns an error if the Memcached client cannot be created.
    pub fn new() -> Result<Self> {
        let memcached_url = std::env::var("MEMCACHED_URL")
            .unwrap_or_else(|_| "memcache://127.0.0.1:11211".to_string());
        Self::with_url(&memcached_url)
    }

    /// Create a store connected to an explicit URL
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot connect or the server does
    /// not answer a `version` command.
    pub fn with_url(memcached_url: &str) -> Result<Self> {
        info!(url = %memcached_url, "Initializing Memcached Store");

        let client = memcache::connect(memcached_url)
            .map_err(|e| anyhow!("Failed to connect to Memcached: {e}"))?;

        // Test connection with version command
        match client.version() {
            Ok(versions) => {
                info!(
                    url = %memcached_url,
                    server_count = versions.len(),
                    "Memcached Store connected successfully"
                );
            }
            Err(e) => {
                return Err(anyhow!("Memcached connection test failed: {e}"));
            }
        }

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Run one blocking client call off the async runtime
    async fn run<T, F>(&self, command: &'static str, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&memcache::Client) -> Result<T, MemcacheError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || call(client.as_ref()))
            .await
            .map_err(|e| anyhow!("Memcached {command} task failed: {e}"))?
            .map_err(|e| anyhow!("Memcached {command} failed: {e}"))
    }

    /// Run a storage command whose "not stored" answer is a normal outcome
    async fn store<F>(&self, command: &'static str, call: F) -> Result<bool>
    where
        F: FnOnce(&memcache::Client) -> Result<(), MemcacheError> + Send + 'static,
    {
        self.run(command, move |client| match call(client) {
            Ok(()) => Ok(true),
            Err(MemcacheError::CommandError(_)) => Ok(false),
            Err(e) => Err(e),
        })
        .await
    }

    /// Run `incr`/`decr`, mapping "not found" to `None`
    ///
    /// The server answers both a missing key and a non-numeric value with a
    /// command error; a follow-up `get` tells them apart.
    async fn adjust<F>(&self, command: &'static str, key: String, call: F) -> Result<Option<u64>>
    where
        F: FnOnce(&memcache::Client, &str) -> Result<u64, MemcacheError> + Send + 'static,
    {
        self.run(command, move |client| match call(client, &key) {
            Ok(n) => Ok(Some(n)),
            Err(e @ MemcacheError::CommandError(_)) => {
                if client.get::<Vec<u8>>(&key)?.is_none() {
                    Ok(None)
                } else {
                    Err(e)
                }
            }
            Err(e) => Err(e),
        })
        .await
    }
}

/// Memcached takes expirations in whole seconds, 0 meaning "never"
fn expiration_secs(expiration: Option<Duration>) -> u32 {
    expiration.map_or(0, |ttl| {
        u32::try_from(ttl.as_secs().max(1)).unwrap_or(u32::MAX)
    })
}

// ===== Trait Implementations =====

use crate::traits::RemoteCache;
use async_trait::async_trait;

/// Implement `RemoteCache` trait for `MemcachedStore`
#[async_trait]
impl RemoteCache for MemcachedStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_owned();
        self.run("GET", move |client| client.get::<Vec<u8>>(&key))
            .await
    }

    async fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>> {
        let keys: Vec<String> = keys.iter().map(|key| (*key).to_owned()).collect();
        let found = self
            .run("GETS", move |client| {
                let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
                client.gets::<Vec<u8>>(&refs)
            })
            .await?;
        debug!(found = found.len(), "[Memcached] Multi-get completed");
        Ok(found)
    }

    async fn add(&self, key: &str, value: &[u8], expiration: Option<Duration>) -> Result<bool> {
        let (key, value) = (key.to_owned(), value.to_vec());
        let secs = expiration_secs(expiration);
        self.store("ADD", move |client| {
            client.add(&key, value.as_slice(), secs)
        })
        .await
    }

    async fn set(&self, key: &str, value: &[u8], expiration: Option<Duration>) -> Result<bool> {
        let (key, value) = (key.to_owned(), value.to_vec());
        let secs = expiration_secs(expiration);
        self.store("SET", move |client| {
            client.set(&key, value.as_slice(), secs)
        })
        .await
    }

    async fn replace(
        &self,
        key: &str,
        value: &[u8],
        expiration: Option<Duration>,
    ) -> Result<bool> {
        let (key, value) = (key.to_owned(), value.to_vec());
        let secs = expiration_secs(expiration);
        self.store("REPLACE", move |client| {
            client.replace(&key, value.as_slice(), secs)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_owned();
        self.run("DELETE", move |client| client.delete(&key)).await
    }

    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.adjust("INCR", key.to_owned(), move |client, key| {
            client.increment(key, delta)
        })
        .await
    }

    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.adjust("DECR", key.to_owned(), move |client, key| {
            client.decrement(key, delta)
        })
        .await
    }

    async fn flush_all(&self) -> Result<bool> {
        self.run("FLUSH_ALL", memcache::Client::flush).await?;
        Ok(true)
    }

    async fn health_check(&self) -> bool {
        self.run("VERSION", memcache::Client::version).await.is_ok()
    }

    fn name(&self) -> &'static str {
        "Memcached"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiration_secs() {
        assert_eq!(expiration_secs(None), 0);
        assert_eq!(expiration_secs(Some(Duration::from_secs(90))), 90);
        // sub-second expirations must not turn into "never"
        assert_eq!(expiration_secs(Some(Duration::from_millis(200))), 1);
    }
}
