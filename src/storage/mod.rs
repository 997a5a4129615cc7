use std::{
    collections::HashMap,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use tokio::time::Instant;

pub mod expirable;
pub mod storage;

pub use storage::Storage;

use crate::driver::RELATIVE_EXPIRATION_LIMIT;

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expiration: u32,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

type Entries = HashMap<String, Entry>;

/// Resolves a memcached expiration value against `now`.
pub fn deadline(expiration: u32, now: Instant) -> Option<Instant> {
    match expiration {
        0 => None,
        secs if secs <= RELATIVE_EXPIRATION_LIMIT => {
            Some(now + Duration::from_secs(u64::from(secs)))
        }
        at => {
            let at = UNIX_EPOCH + Duration::from_secs(u64::from(at));
            let left = at
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO);
            Some(now + left)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_never_expires() {
        assert_eq!(deadline(0, Instant::now()), None);
    }

    #[test]
    fn small_values_are_relative() {
        let now = Instant::now();
        assert_eq!(deadline(60, now), Some(now + Duration::from_secs(60)));
        assert_eq!(
            deadline(RELATIVE_EXPIRATION_LIMIT, now),
            Some(now + Duration::from_secs(u64::from(RELATIVE_EXPIRATION_LIMIT)))
        );
    }

    #[test]
    fn future_timestamp_is_absolute() {
        let now = Instant::now();
        let unix_now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let at = u32::try_from(unix_now + 60).unwrap();

        let left = deadline(at, now).unwrap() - now;
        assert!(left > Duration::from_secs(58), "{left:?}");
        assert!(left <= Duration::from_secs(60), "{left:?}");
    }

    #[test]
    fn past_timestamp_expires_now() {
        let now = Instant::now();
        assert_eq!(deadline(RELATIVE_EXPIRATION_LIMIT + 1, now), Some(now));
    }
}
