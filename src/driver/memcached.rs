use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::task;
use tracing::debug;

use super::{Driver, Item};
use crate::error::DriverError;

/// [`Driver`] over the blocking `memcache` client.
///
/// Every call is moved onto tokio's blocking pool; connection handling,
/// hashing across servers and protocol framing stay inside the client.
#[derive(Clone)]
pub struct MemcacheDriver {
    client: Arc<memcache::Client>,
}

impl std::fmt::Debug for MemcacheDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcacheDriver").finish_non_exhaustive()
    }
}

impl MemcacheDriver {
    pub fn new(client: memcache::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Connects to `url`, e.g. `memcache://127.0.0.1:11211`.
    pub async fn connect(url: &str) -> Result<Self, DriverError> {
        let url = url.to_owned();
        debug!(%url, "connecting to memcached");
        let client = task::spawn_blocking(move || memcache::Client::connect(url.as_str())).await??;
        Ok(Self::new(client))
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, DriverError>
    where
        T: Send + 'static,
        F: FnOnce(&memcache::Client) -> Result<T, DriverError> + Send + 'static,
    {
        let client = self.client.clone();
        task::spawn_blocking(move || f(&client)).await?
    }
}

#[async_trait]
impl Driver for MemcacheDriver {
    async fn get(&self, key: &str) -> Result<Item, DriverError> {
        let key = key.to_owned();
        self.blocking(move |c| match c.get::<Vec<u8>>(&key)? {
            Some(value) => Ok(Item::new(key, value, 0)),
            None => Err(DriverError::CacheMiss),
        })
        .await
    }

    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, Item>, DriverError> {
        let keys = keys.to_vec();
        self.blocking(move |c| {
            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let found = c.gets::<Vec<u8>>(&refs)?;

            Ok(found
                .into_iter()
                .map(|(key, value)| {
                    let item = Item::new(key.clone(), Bytes::from(value), 0);
                    (key, item)
                })
                .collect())
        })
        .await
    }

    async fn set(&self, item: Item) -> Result<(), DriverError> {
        self.blocking(move |c| {
            c.set(&item.key, &item.value[..], item.expiration)?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), DriverError> {
        let key = key.to_owned();
        self.blocking(move |c| match c.delete(&key)? {
            true => Ok(()),
            false => Err(DriverError::CacheMiss),
        })
        .await
    }

    async fn flush_all(&self) -> Result<(), DriverError> {
        self.blocking(|c| {
            c.flush()?;
            Ok(())
        })
        .await
    }
}
