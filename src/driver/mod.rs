use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::DriverError;

#[cfg(feature = "memcached")]
pub mod memcached;

/// Largest expiration memcached treats as relative seconds (30 days).
/// Anything above is an absolute unix timestamp.
pub const RELATIVE_EXPIRATION_LIMIT: u32 = 60 * 60 * 24 * 30;

/// A stored value as the backend sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: String,
    pub value: Bytes,
    /// Expiration memcached style: 0 never expires, up to
    /// [`RELATIVE_EXPIRATION_LIMIT`] is seconds from now, above it a unix time.
    pub expiration: u32,
}

impl Item {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>, expiration: u32) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expiration,
        }
    }
}

/// The capabilities consumed from an external key-value client.
///
/// Implementations report an absent key as [`DriverError::CacheMiss`] from
/// `get` and `delete`. `get_multi` leaves absent keys out of the result.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn get(&self, key: &str) -> Result<Item, DriverError>;
    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, Item>, DriverError>;
    async fn set(&self, item: Item) -> Result<(), DriverError>;
    async fn delete(&self, key: &str) -> Result<(), DriverError>;
    async fn flush_all(&self) -> Result<(), DriverError>;
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Arc<D> {
    async fn get(&self, key: &str) -> Result<Item, DriverError> {
        (**self).get(key).await
    }

    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, Item>, DriverError> {
        (**self).get_multi(keys).await
    }

    async fn set(&self, item: Item) -> Result<(), DriverError> {
        (**self).set(item).await
    }

    async fn delete(&self, key: &str) -> Result<(), DriverError> {
        (**self).delete(key).await
    }

    async fn flush_all(&self) -> Result<(), DriverError> {
        (**self).flush_all().await
    }
}
