//! missionsync - realtime update delivery layer
//!
//! A connection multiplexer that maintains long-lived bidirectional channels
//! to a backend, multiplexes many logical topics (one per long-running
//! mission) over a small number of physical connections, guarantees ordered,
//! de-duplicated, at-least-once delivery of update events to subscribers, and
//! recovers transparently from transient network failures.
//!
//! Surrounding application features are external collaborators: they issue
//! request/response calls to a conventional HTTP API and register as
//! listeners on this layer.

pub mod arguments;
pub mod config;
pub mod errors;
pub mod logger;
pub mod realtime;
pub mod topics;

pub use errors::{SyncError, SyncResult};
pub use realtime::{
    ChannelClass, ClientFrame, ConnKey, Connection, ConnectionPool, LinkState, ServerFrame,
    UpdateAction, UpdateFrame,
};
pub use topics::{KeyRegistry, KeyStrategy, SubscriptionManager, TopicEvent, TopicProcessor};
