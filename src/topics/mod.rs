/// Topic subscription management
///
/// Maps application-level topic ids (one per long-running mission) onto a
/// shared connection, tracks subscribe/unsubscribe state as durable
/// client-owned intent, and fans topic-scoped inbound frames out to the
/// per-topic update processors.
///
/// ## Key components
/// - `SubscriptionManager`: subscribe/unsubscribe, routing, re-subscribe on
///   connection reopen
/// - `processor`: the per-topic sequential worker
/// - `state`: the pure merge/dedup algorithm
pub mod processor;
pub mod state;

pub use processor::{TopicEvent, TopicProcessor};
pub use state::{IdKeyStrategy, KeyRegistry, KeyStrategy, MergeOutcome, TopicState};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::arguments::is_debug_topics_enabled;
use crate::errors::SyncResult;
use crate::logger::{self, LogTag};
use crate::realtime::connection::{Connection, LinkState, ReopenHandle};
use crate::realtime::listeners::ListenerHandle;
use crate::realtime::message::{ClientFrame, ServerFrame};

struct ManagerInner {
    topics: Mutex<HashMap<String, Arc<TopicProcessor>>>,
}

/// Tracks topic subscriptions over one shared connection
///
/// Subscriptions are client-owned intent, not state borrowed from the
/// transport: on every reopen the manager retransmits a subscribe frame for
/// each topic still marked active, ahead of any queued outbound frames.
pub struct SubscriptionManager {
    conn: Arc<Connection>,
    inner: Arc<ManagerInner>,
    _frame_listener: ListenerHandle<ServerFrame>,
    _reopen_hook: ReopenHandle,
}

impl SubscriptionManager {
    pub fn new(conn: Arc<Connection>) -> Self {
        let inner = Arc::new(ManagerInner {
            topics: Mutex::new(HashMap::new()),
        });

        let routing = inner.clone();
        let frame_listener = conn.on_frame(move |frame| match frame {
            ServerFrame::Update(update) => {
                let processor = routing.topics.lock().get(&update.topic_id).cloned();
                match processor {
                    Some(processor) => processor.enqueue_frame(update.clone()),
                    None => {
                        // Late unsubscribe race: stale cross-talk is dropped,
                        // never queued
                        if is_debug_topics_enabled() {
                            logger::debug(
                                LogTag::Topics,
                                &format!(
                                    "Dropping '{}' frame for unsubscribed topic {}",
                                    update.kind, update.topic_id
                                ),
                            );
                        }
                    }
                }
            }
            ServerFrame::Truncate { topic_id } => {
                let processor = routing.topics.lock().get(topic_id).cloned();
                match processor {
                    Some(processor) => processor.enqueue_truncate(),
                    None => {
                        if is_debug_topics_enabled() {
                            logger::debug(
                                LogTag::Topics,
                                &format!("Dropping truncate for unsubscribed topic {}", topic_id),
                            );
                        }
                    }
                }
            }
            _ => {}
        });

        let resubscribe = inner.clone();
        let reopen_hook = conn.on_reopen(move || {
            resubscribe
                .topics
                .lock()
                .keys()
                .map(|topic_id| ClientFrame::Subscribe {
                    topic_id: topic_id.clone(),
                })
                .collect()
        });

        Self {
            conn,
            inner,
            _frame_listener: frame_listener,
            _reopen_hook: reopen_hook,
        }
    }

    /// The connection this manager multiplexes over
    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Subscribe with the default dedup key strategy (`id` field)
    pub fn subscribe_topic(&self, topic_id: &str) -> SyncResult<Arc<TopicProcessor>> {
        self.subscribe_topic_with(topic_id, KeyRegistry::new())
    }

    /// Subscribe a topic: no-op returning the existing processor if already
    /// subscribed, otherwise installs the per-topic processor and transmits
    /// a subscribe frame
    pub fn subscribe_topic_with(
        &self,
        topic_id: &str,
        keys: KeyRegistry,
    ) -> SyncResult<Arc<TopicProcessor>> {
        let (processor, created) = {
            let mut topics = self.inner.topics.lock();
            match topics.get(topic_id) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let processor = Arc::new(TopicProcessor::spawn(topic_id, keys));
                    topics.insert(topic_id.to_string(), processor.clone());
                    (processor, true)
                }
            }
        };

        if !created {
            return Ok(processor);
        }

        logger::info(LogTag::Topics, &format!("Subscribed to topic {}", topic_id));

        // While the link is down the reopen hook will carry the subscribe
        // frame; sending it here too would duplicate it on open
        if self.conn.state() == LinkState::Open {
            self.conn.send_frame(&ClientFrame::Subscribe {
                topic_id: topic_id.to_string(),
            })?;
        }

        Ok(processor)
    }

    /// Unsubscribe a topic and tear down its processor and queue. Idempotent:
    /// unknown topics are a no-op.
    pub fn unsubscribe_topic(&self, topic_id: &str) {
        let removed = self.inner.topics.lock().remove(topic_id);
        if removed.is_none() {
            return;
        }

        logger::info(LogTag::Topics, &format!("Unsubscribed from topic {}", topic_id));

        if self.conn.state() == LinkState::Open {
            let frame = ClientFrame::Unsubscribe {
                topic_id: topic_id.to_string(),
            };
            if let Err(e) = self.conn.send_frame(&frame) {
                logger::warning(
                    LogTag::Topics,
                    &format!("Failed to send unsubscribe for {}: {}", topic_id, e),
                );
            }
        }
    }

    pub fn is_subscribed(&self, topic_id: &str) -> bool {
        self.inner.topics.lock().contains_key(topic_id)
    }

    /// Processor handle for a subscribed topic
    pub fn processor(&self, topic_id: &str) -> Option<Arc<TopicProcessor>> {
        self.inner.topics.lock().get(topic_id).cloned()
    }

    pub fn subscribed_topics(&self) -> Vec<String> {
        self.inner.topics.lock().keys().cloned().collect()
    }

    /// Whether topic delivery is currently live (connection open)
    pub fn is_live(&self) -> bool {
        self.conn.state() == LinkState::Open
    }
}
