use std::io;

use thiserror::Error;

/// Failures reported by a [`Driver`](crate::driver::Driver).
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("cache miss")]
    CacheMiss,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[cfg(feature = "memcached")]
    #[error("memcache: {0}")]
    Memcache(#[from] memcache::MemcacheError),

    #[error("driver task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DriverError {
    pub fn is_miss(&self) -> bool {
        matches!(self, DriverError::CacheMiss)
    }
}

/// Failures reported by the cache interface.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("key not found: {key}")]
    NotFound { key: String },

    #[error("cache backend failure: {0}")]
    Io(#[source] DriverError),
}

impl CacheError {
    /// Classifies a driver failure for `key`: misses become `NotFound`,
    /// everything else is an I/O failure.
    pub(crate) fn from_driver(key: &str, err: DriverError) -> Self {
        match err {
            DriverError::CacheMiss => CacheError::NotFound {
                key: key.to_owned(),
            },
            other => CacheError::Io(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound { .. })
    }
}
