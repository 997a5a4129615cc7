//! The uniform cache interface and its driver-backed implementation.

use std::{
    collections::HashMap,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::{
    driver::{Driver, Item, RELATIVE_EXPIRATION_LIMIT},
    error::CacheError,
};

/// String-valued cache operations shared by every backend.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Whether a fetch for `key` would succeed. Any failure reads as absence.
    async fn contains(&self, key: &str) -> bool;

    async fn fetch(&self, key: &str) -> Result<String, CacheError>;

    /// Values for the keys that were found. A backend failure yields an
    /// empty map rather than an error.
    async fn fetch_multi(&self, keys: &[String]) -> HashMap<String, String>;

    /// Stores `value` under `key`; `ttl` is truncated to whole seconds and
    /// zero means no expiry.
    async fn save(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn flush(&self) -> Result<(), CacheError>;
}

/// Forwards [`Cache`] calls to an externally constructed [`Driver`].
#[derive(Debug, Clone)]
pub struct CacheAdapter<D> {
    driver: D,
}

impl<D> CacheAdapter<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }
}

/// Memcached expiration for `ttl`, truncated to whole seconds.
///
/// Up to 30 days this is the relative second count. Longer ttls are sent as
/// an absolute unix time, since the backend reads large values that way.
pub fn expiration_secs(ttl: Duration) -> u32 {
    expiration_at(ttl, SystemTime::now())
}

fn expiration_at(ttl: Duration, now: SystemTime) -> u32 {
    let secs = ttl.as_secs();
    if secs <= u64::from(RELATIVE_EXPIRATION_LIMIT) {
        // Fits, the limit is below u32::MAX.
        return secs as u32;
    }

    let unix_now = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    u32::try_from(unix_now.saturating_add(secs)).unwrap_or(u32::MAX)
}

fn text(value: &Bytes) -> String {
    String::from_utf8_lossy(value).into_owned()
}

#[async_trait]
impl<D: Driver> Cache for CacheAdapter<D> {
    async fn contains(&self, key: &str) -> bool {
        self.fetch(key).await.is_ok()
    }

    async fn fetch(&self, key: &str) -> Result<String, CacheError> {
        debug!(key, "fetch");
        let item = self
            .driver
            .get(key)
            .await
            .map_err(|e| CacheError::from_driver(key, e))?;

        Ok(text(&item.value))
    }

    async fn fetch_multi(&self, keys: &[String]) -> HashMap<String, String> {
        debug!(count = keys.len(), "fetch multi");
        match self.driver.get_multi(keys).await {
            Ok(items) => items
                .into_values()
                .map(|item| {
                    let value = text(&item.value);
                    (item.key, value)
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "fetch multi failed, returning no values");
                HashMap::new()
            }
        }
    }

    async fn save(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let expiration = expiration_secs(ttl);
        debug!(key, expiration, "save");
        let item = Item::new(key, Bytes::copy_from_slice(value.as_bytes()), expiration);

        self.driver.set(item).await.map_err(CacheError::Io)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        debug!(key, "delete");
        self.driver
            .delete(key)
            .await
            .map_err(|e| CacheError::from_driver(key, e))
    }

    async fn flush(&self) -> Result<(), CacheError> {
        debug!("flush");
        self.driver.flush_all().await.map_err(CacheError::Io)
    }
}
