/// Realtime connection layer
///
/// Multiplexes many logical topics over a small number of persistent
/// WebSocket connections with ordered, de-duplicated, at-least-once delivery
/// and transparent recovery from transient network failures.
///
/// ## Key components
/// - `pool`: keyed connection registry (one live connection per key)
/// - `connection`: physical link handle, driver task, outbound queue
/// - `reconnect`: capped exponential backoff policy
/// - `keepalive`: liveness probing per open link
/// - `dedup`: short-TTL wire-level duplicate suppression
/// - `message`: frame schema and classification
/// - `listeners`: multi-subscriber callback sets with disposer handles
/// - `metrics`: per-connection counters
pub mod connection;
pub mod dedup;
pub mod keepalive;
pub mod listeners;
pub mod message;
pub mod metrics;
pub mod pool;
pub mod reconnect;

pub use connection::{ChannelClass, ConnKey, Connection, LinkState, ReopenHandle};
pub use listeners::{ListenerHandle, ListenerSet};
pub use message::{ClientFrame, ServerFrame, UpdateAction, UpdateFrame};
pub use metrics::{LinkMetrics, LinkMetricsSnapshot};
pub use pool::ConnectionPool;
pub use reconnect::{ReconnectPhase, ReconnectPolicy};
