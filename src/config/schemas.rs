/// Configuration schemas - all config structures defined once with defaults
///
/// Every tunable of the realtime layer lives here. The library takes these
/// structs by value (each pool owns its own copy), the binary loads them from
/// data/config.toml via `config::utils`.
use crate::config_struct;

// ============================================================================
// ROOT CONFIG
// ============================================================================

config_struct! {
    /// Root configuration
    pub struct Config {
        /// Realtime connection layer settings
        realtime: RealtimeConfig = RealtimeConfig::default(),

        /// Authentication settings
        auth: AuthConfig = AuthConfig::default(),
    }
}

// ============================================================================
// REALTIME LAYER
// ============================================================================

config_struct! {
    /// Realtime connection layer configuration
    ///
    /// Covers connection acquisition, keepalive, reconnection backoff and
    /// wire-level duplicate suppression.
    pub struct RealtimeConfig {
        /// Maximum time to wait for the transport to report open
        acquire_timeout_secs: u64 = 10,

        /// Keepalive probe interval
        keepalive_interval_secs: u64 = 20,

        /// How long to wait for a probe acknowledgment before the link
        /// is considered dead
        pong_timeout_secs: u64 = 10,

        /// First reconnect delay; doubles on every attempt
        reconnect_base_delay_ms: u64 = 1000,

        /// Backoff cap
        reconnect_max_delay_secs: u64 = 30,

        /// Reconnect attempts before giving up until the next acquire
        reconnect_max_attempts: u32 = 5,

        /// TTL window for wire-level message id dedup
        wire_dedup_ttl_ms: u64 = 1000,
    }
}

config_struct! {
    /// Authentication configuration
    ///
    /// The bearer token is embedded as a query parameter on the connection
    /// URI; some relay layers do not forward custom headers on WebSocket
    /// upgrades.
    pub struct AuthConfig {
        /// Bearer token presented on every connection attempt
        token: Option<String> = None,

        /// Query parameter name carrying the token
        token_param: String = "token".to_string(),
    }
}
