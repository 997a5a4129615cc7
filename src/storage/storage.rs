use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval, Instant},
};
use tracing::{debug, info};

use super::{deadline, expirable::ExpirationController, Entries, Entry};
use crate::{
    driver::{Driver, Item},
    error::DriverError,
};

#[derive(Debug, Default)]
struct Inner {
    entries: Entries,
    expirations: ExpirationController,
}

/// In-process [`Driver`] following memcached expiration rules.
///
/// Expired entries are hidden from reads as soon as their deadline passes;
/// [`Storage::purge_expired`] (or the reaper) reclaims them.
#[derive(Debug, Clone, Default)]
pub struct Storage {
    cc: Arc<Mutex<Inner>>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.cc
            .lock()
            .await
            .entries
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every entry whose deadline has passed, returning how many went.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.cc.lock().await;
        let Inner {
            entries,
            expirations,
        } = &mut *inner;

        let mut purged = 0;
        for key in expirations.pop_due(now) {
            if entries.get(&key).is_some_and(|e| !e.is_live(now)) {
                entries.remove(&key);
                purged += 1;
            }
        }
        purged
    }

    /// Runs [`Storage::purge_expired`] every `period` until the handle is aborted.
    pub fn spawn_reaper(&self, period: Duration) -> JoinHandle<()> {
        let storage = self.clone();
        tokio::spawn(async move {
            info!(?period, "expiration reaper started");
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                let purged = storage.purge_expired().await;
                if purged > 0 {
                    debug!(purged, "purged expired entries");
                }
            }
        })
    }
}

#[async_trait]
impl Driver for Storage {
    async fn get(&self, key: &str) -> Result<Item, DriverError> {
        let now = Instant::now();
        match self.cc.lock().await.entries.get(key) {
            Some(e) if e.is_live(now) => Ok(Item::new(key, e.value.clone(), e.expiration)),
            _ => Err(DriverError::CacheMiss),
        }
    }

    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, Item>, DriverError> {
        let now = Instant::now();
        let inner = self.cc.lock().await;

        Ok(keys
            .iter()
            .filter_map(|key| {
                let e = inner.entries.get(key).filter(|e| e.is_live(now))?;
                Some((
                    key.clone(),
                    Item::new(key.clone(), e.value.clone(), e.expiration),
                ))
            })
            .collect())
    }

    async fn set(&self, item: Item) -> Result<(), DriverError> {
        let expires_at = deadline(item.expiration, Instant::now());
        let mut inner = self.cc.lock().await;

        if let Some(at) = expires_at {
            inner.expirations.add_expiration(&item.key, at);
        }
        inner.entries.insert(
            item.key,
            Entry {
                value: item.value,
                expiration: item.expiration,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DriverError> {
        let now = Instant::now();
        match self.cc.lock().await.entries.remove(key) {
            Some(e) if e.is_live(now) => Ok(()),
            _ => Err(DriverError::CacheMiss),
        }
    }

    async fn flush_all(&self) -> Result<(), DriverError> {
        let mut inner = self.cc.lock().await;
        inner.entries.clear();
        inner.expirations.clear();
        Ok(())
    }
}
