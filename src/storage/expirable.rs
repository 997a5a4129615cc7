use std::{cmp::Ordering, collections::BinaryHeap};

use tokio::time::Instant;

#[derive(PartialEq, Eq, Debug)]
struct Expirable {
    id: String,
    expires_at: Instant,
}

// Reversed so the heap yields the earliest deadline first.
impl Ord for Expirable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expires_at
            .cmp(&other.expires_at)
            .reverse()
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Expirable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deadline queue for stored keys.
///
/// A key may be queued more than once when it is overwritten; callers check
/// the entry's current deadline before acting on a popped key.
#[derive(Debug, Default)]
pub struct ExpirationController {
    queue: BinaryHeap<Expirable>,
}

impl ExpirationController {
    pub fn add_expiration(&mut self, key: &str, expires_at: Instant) {
        self.queue.push(Expirable {
            id: key.to_owned(),
            expires_at,
        });
    }

    /// Removes and returns every key whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Vec<String> {
        let mut due = Vec::new();
        while let Some(next) = self.queue.peek() {
            if next.expires_at > now {
                break;
            }
            if let Some(next) = self.queue.pop() {
                due.push(next.id);
            }
        }
        due
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
