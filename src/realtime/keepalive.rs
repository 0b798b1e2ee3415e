/// Keepalive driver
///
/// Tracks liveness of one open link. A fixed-interval tick sends a probe
/// frame when none is pending; a server probe is answered immediately so an
/// echo-based heartbeat at the far end never mistakes client inactivity for
/// a dead peer. The tracker lives inside the driver task's read/write loop,
/// so it is cancelled with the socket and restarted on reopen.
use std::time::{Duration, Instant};

/// Keepalive configuration
#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    /// Probe interval
    pub interval: Duration,

    /// How long to wait for the acknowledgment after a probe
    pub pong_timeout: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

/// Per-link keepalive state
#[derive(Debug)]
pub struct KeepaliveDriver {
    last_activity: Instant,
    pending_ping: Option<Instant>,
    config: KeepaliveConfig,
}

impl KeepaliveDriver {
    pub fn new(config: KeepaliveConfig) -> Self {
        Self {
            last_activity: Instant::now(),
            pending_ping: None,
            config,
        }
    }

    /// Granularity of the driver's tick timer. Finer than the probe
    /// interval so an overdue probe is caught near the pong timeout rather
    /// than a full interval later.
    pub fn tick_period(&self) -> Duration {
        self.config
            .interval
            .min(self.config.pong_timeout / 2)
            .max(Duration::from_millis(10))
    }

    /// Record inbound traffic (any frame counts as liveness)
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Record that a probe was sent
    pub fn record_ping(&mut self) {
        self.pending_ping = Some(Instant::now());
    }

    /// Record the acknowledgment of our probe
    pub fn record_pong(&mut self) {
        self.pending_ping = None;
        self.last_activity = Instant::now();
    }

    /// True when a tick should send a probe: none pending and the link has
    /// been quiet for a full interval
    pub fn should_ping(&self) -> bool {
        self.pending_ping.is_none() && self.last_activity.elapsed() >= self.config.interval
    }

    /// True when a sent probe went unanswered past the timeout; the link is
    /// treated as dead (unclean close)
    pub fn is_pong_overdue(&self) -> bool {
        self.pending_ping
            .map(|at| at.elapsed() > self.config.pong_timeout)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_keepalive_probe_cycle() {
        let mut ka = KeepaliveDriver::new(KeepaliveConfig {
            interval: Duration::from_millis(30),
            pong_timeout: Duration::from_millis(20),
        });

        // Fresh link: quiet period not elapsed yet
        assert!(!ka.should_ping());

        sleep(Duration::from_millis(40));
        assert!(ka.should_ping());

        ka.record_ping();
        assert!(!ka.should_ping()); // probe pending
        assert!(!ka.is_pong_overdue());

        sleep(Duration::from_millis(30));
        assert!(ka.is_pong_overdue());

        ka.record_pong();
        assert!(!ka.is_pong_overdue());
        assert!(!ka.should_ping()); // pong counted as activity
    }

    #[test]
    fn test_inbound_traffic_defers_probe() {
        let mut ka = KeepaliveDriver::new(KeepaliveConfig {
            interval: Duration::from_millis(50),
            pong_timeout: Duration::from_millis(20),
        });

        sleep(Duration::from_millis(30));
        ka.record_activity();
        sleep(Duration::from_millis(30));
        // only 30ms since last activity, under the 50ms interval
        assert!(!ka.should_ping());
    }
}
