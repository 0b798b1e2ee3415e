/// Per-connection statistics
///
/// Cheap atomic counters maintained by the driver task and readable from any
/// handle. Logged on disconnect as a lifecycle summary.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one connection
#[derive(Debug, Default)]
pub struct LinkMetrics {
    frames_in: AtomicU64,
    frames_out: AtomicU64,
    duplicates_dropped: AtomicU64,
    malformed_dropped: AtomicU64,
    reconnects: AtomicU64,
}

impl LinkMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn frame_received(&self) {
        self.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_sent(&self) {
        self.frames_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplicate_dropped(&self) {
        self.duplicates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_dropped(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnect_started(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LinkMetricsSnapshot {
        LinkMetricsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_out: self.frames_out.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMetricsSnapshot {
    pub frames_in: u64,
    pub frames_out: u64,
    pub duplicates_dropped: u64,
    pub malformed_dropped: u64,
    pub reconnects: u64,
}

impl std::fmt::Display for LinkMetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "in={} out={} dup_dropped={} malformed={} reconnects={}",
            self.frames_in,
            self.frames_out,
            self.duplicates_dropped,
            self.malformed_dropped,
            self.reconnects
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counting() {
        let metrics = LinkMetrics::new();
        metrics.frame_received();
        metrics.frame_received();
        metrics.frame_sent();
        metrics.duplicate_dropped();

        let snap = metrics.snapshot();
        assert_eq!(snap.frames_in, 2);
        assert_eq!(snap.frames_out, 1);
        assert_eq!(snap.duplicates_dropped, 1);
        assert_eq!(snap.reconnects, 0);
    }
}
