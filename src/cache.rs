//! Persistent TTL cache for collaborator responses
//!
//! Entries are postcard-encoded with an absolute expiry and stored in a fjall
//! keyspace. Expired entries are removed on read. When the cache was never
//! initialized (disabled in config, or in tests) every lookup misses and every
//! store is dropped.

use anyhow::{Result, anyhow};
use fjall::Keyspace;
use rand::RngExt;
use serde::Deserialize;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;
use tokio::task;
use tracing::{debug, warn};

static GLOBAL_CACHE: OnceCell<PersistentCache> = OnceCell::const_new();

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (seconds)
}

pub struct PersistentCache {
    store: Keyspace,
}

fn now_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl PersistentCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("responses", fjall::KeyspaceCreateOptions::default)?;
        Ok(PersistentCache { store: items })
    }

    /// Stores a serializable value with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + Send + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = now_secs()?
            .checked_add(ttl.as_secs())
            .ok_or(anyhow!("TTL overflow"))?;
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry)?;

        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes = task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        let Some(bytes) = maybe_bytes else {
            debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry<T> = postcard::from_bytes(&bytes)?;
        if now_secs()? < entry.expires_at {
            debug!("Key found and still fresh");
            Ok(Some(entry.value))
        } else {
            debug!("Key found but expired");
            self.remove(key).await?;
            Ok(None)
        }
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// Initializes the global persistent cache. Call once at startup.
pub fn init(path: impl AsRef<Path>) -> Result<()> {
    let cache = PersistentCache::open(path)?;
    GLOBAL_CACHE
        .set(cache)
        .map_err(|_| anyhow!("Cache already initialized"))?;
    Ok(())
}

#[must_use]
pub fn is_initialized() -> bool {
    GLOBAL_CACHE.initialized()
}

/// `ttl` scaled by a random factor in [0.9, 1.1) so entries written together
/// do not all expire together
#[must_use]
pub fn jittered(ttl: Duration) -> Duration {
    let jitter: f64 = rand::rng().random_range(0.9..1.1);
    ttl.mul_f64(jitter)
}

pub async fn put<T: Serialize + Send + 'static>(key: &str, value: T, ttl: Duration) -> Result<()> {
    match GLOBAL_CACHE.get() {
        Some(cache) => cache.put(key, value, ttl).await,
        None => Ok(()),
    }
}

pub async fn get<T: DeserializeOwned + Send + 'static>(key: &str) -> Result<Option<T>> {
    match GLOBAL_CACHE.get() {
        Some(cache) => cache.get(key).await,
        None => Ok(None),
    }
}

pub async fn remove(key: &str) -> Result<()> {
    match GLOBAL_CACHE.get() {
        Some(cache) => cache.remove(key).await,
        None => Ok(()),
    }
}

/// Cache lookup that never fails: errors are logged and treated as a miss
pub async fn lookup<T: DeserializeOwned + Send + 'static>(key: &str) -> Option<T> {
    get(key).await.unwrap_or_else(|e| {
        warn!(key, "cache read failed, bypassing: {e:#}");
        None
    })
}

/// Store with jittered TTL; errors are logged and ignored
pub async fn store<T: Serialize + Send + Debug + 'static>(key: &str, value: T, ttl: Duration) {
    if let Err(e) = put(key, value, jittered(ttl)).await {
        warn!(key, "cache write failed, bypassing: {e:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_then_get() {
        let tmp = TempDir::new().unwrap();
        let cache = PersistentCache::open(tmp.path()).unwrap();

        cache
            .put("route:a:b", (54.2_f64, 63.5_f64), Duration::from_secs(60))
            .await
            .unwrap();
        let value: Option<(f64, f64)> = cache.get("route:a:b").await.unwrap();
        assert_eq!(value, Some((54.2, 63.5)));
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed() {
        let tmp = TempDir::new().unwrap();
        let cache = PersistentCache::open(tmp.path()).unwrap();

        cache
            .put("forecast:x", "stale".to_string(), Duration::ZERO)
            .await
            .unwrap();
        let value: Option<String> = cache.get("forecast:x").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let tmp = TempDir::new().unwrap();
        let cache = PersistentCache::open(tmp.path()).unwrap();
        let value: Option<u64> = cache.get("nope").await.unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let ttl = Duration::from_secs(3_600);
        for _ in 0..100 {
            let jittered = jittered(ttl);
            assert!(jittered >= Duration::from_secs(3_240));
            assert!(jittered <= Duration::from_secs(3_960));
        }
    }
}
