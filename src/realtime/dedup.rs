/// Wire-level message deduplicator
///
/// Short-TTL suppression of duplicate transport frames keyed by the optional
/// `msg_id` field. Guards against at-least-once delivery producing duplicate
/// frames during reconnection windows. Independent of the topic-level domain
/// dedup, which has no TTL and is keyed by content.
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// TTL cache of recently seen message identifiers
#[derive(Debug)]
pub struct FrameDedup {
    seen: HashMap<String, Instant>,
    ttl: Duration,
}

impl FrameDedup {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            ttl,
        }
    }

    /// Record a message id, reporting whether it was already seen within the
    /// TTL window. Expired entries are evicted lazily on each call.
    pub fn check_and_record(&mut self, msg_id: &str) -> bool {
        let now = Instant::now();
        self.seen.retain(|_, at| now.duration_since(*at) < self.ttl);

        if self.seen.contains_key(msg_id) {
            return true;
        }

        self.seen.insert(msg_id.to_string(), now);
        false
    }

    /// Number of live entries (expired ones may still be counted until the
    /// next check evicts them)
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
