/// Per-topic update processor
///
/// Each topic owns a single worker task consuming an unbounded queue, so two
/// update frames arriving back-to-back are applied to topic state in arrival
/// order even when their handling interleaves with other tasks. The worker
/// owns the `TopicState` and mutates it synchronously within one command
/// turn; listeners observe the merged result or an invalidation signal.
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::arguments::is_debug_topics_enabled;
use crate::logger::{self, LogTag};
use crate::realtime::listeners::{ListenerHandle, ListenerSet};
use crate::realtime::message::UpdateFrame;

use super::state::{KeyRegistry, MergeOutcome, TopicState};

/// What listeners observe for a topic
#[derive(Debug, Clone)]
pub enum TopicEvent {
    /// An update changed the merged collection; carries the update kind and
    /// the full merged collection
    Updated { kind: String, items: Vec<Value> },

    /// The server invalidated the topic: client-side state was discarded and
    /// authoritative state must be re-fetched over the request/response API
    Invalidated,
}

enum ProcessorCommand {
    Frame(UpdateFrame),
    Truncate,
    SetBaseline(Vec<Value>),
}

/// Handle to one topic's sequential processing queue
///
/// Dropping the handle stops the worker.
pub struct TopicProcessor {
    topic_id: String,
    tx: mpsc::UnboundedSender<ProcessorCommand>,
    listeners: Arc<ListenerSet<TopicEvent>>,
}

impl TopicProcessor {
    /// Spawn the worker for one topic
    pub fn spawn(topic_id: impl Into<String>, keys: KeyRegistry) -> Self {
        let topic_id = topic_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let listeners: Arc<ListenerSet<TopicEvent>> = ListenerSet::new();

        tokio::spawn(run_worker(
            topic_id.clone(),
            TopicState::new(keys),
            rx,
            listeners.clone(),
        ));

        Self {
            topic_id,
            tx,
            listeners,
        }
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    /// Register a listener for every event on this topic
    pub fn on_event(
        &self,
        callback: impl Fn(&TopicEvent) + Send + Sync + 'static,
    ) -> ListenerHandle<TopicEvent> {
        self.listeners.add(callback)
    }

    /// Register a listener for merged updates of one kind only
    pub fn on_kind(
        &self,
        kind: impl Into<String>,
        callback: impl Fn(&[Value]) + Send + Sync + 'static,
    ) -> ListenerHandle<TopicEvent> {
        let kind = kind.into();
        self.listeners.add(move |event| {
            if let TopicEvent::Updated { kind: k, items } = event {
                if *k == kind {
                    callback(items);
                }
            }
        })
    }

    /// Install already-known state fetched over the request/response API
    pub fn set_baseline(&self, items: Vec<Value>) {
        let _ = self.tx.send(ProcessorCommand::SetBaseline(items));
    }

    /// Queue an update frame for ordered application
    pub(crate) fn enqueue_frame(&self, frame: UpdateFrame) {
        let _ = self.tx.send(ProcessorCommand::Frame(frame));
    }

    /// Queue an invalidation signal
    pub(crate) fn enqueue_truncate(&self) {
        let _ = self.tx.send(ProcessorCommand::Truncate);
    }
}

async fn run_worker(
    topic_id: String,
    mut state: TopicState,
    mut rx: mpsc::UnboundedReceiver<ProcessorCommand>,
    listeners: Arc<ListenerSet<TopicEvent>>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            ProcessorCommand::Frame(frame) => match state.apply(&frame) {
                MergeOutcome::Changed { added } => {
                    if is_debug_topics_enabled() {
                        logger::debug(
                            LogTag::Processor,
                            &format!(
                                "Topic {}: merged {} item(s) from '{}' (total {})",
                                topic_id,
                                added,
                                frame.kind,
                                state.items().len()
                            ),
                        );
                    }
                    listeners.emit(&TopicEvent::Updated {
                        kind: frame.kind,
                        items: state.items().to_vec(),
                    });
                }
                MergeOutcome::Unchanged => {
                    if is_debug_topics_enabled() {
                        logger::debug(
                            LogTag::Processor,
                            &format!(
                                "Topic {}: '{}' event was fully duplicate, not published",
                                topic_id, frame.kind
                            ),
                        );
                    }
                }
            },
            ProcessorCommand::Truncate => {
                state.truncate();
                logger::info(
                    LogTag::Processor,
                    &format!("Topic {}: state invalidated, re-fetch required", topic_id),
                );
                listeners.emit(&TopicEvent::Invalidated);
            }
            ProcessorCommand::SetBaseline(items) => {
                state.set_baseline(items);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::message::UpdateAction;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;

    fn append(ids: &[(&str, i64)]) -> UpdateFrame {
        let items: Vec<Value> = ids
            .iter()
            .map(|(id, ts)| json!({"id": id, "ts": ts}))
            .collect();
        UpdateFrame {
            topic_id: "m1".to_string(),
            kind: "activity".to_string(),
            action: UpdateAction::Append,
            ts: None,
            data: Value::Array(items),
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_events_applied_in_arrival_order() {
        let processor = TopicProcessor::spawn("m1", KeyRegistry::new());

        let published: Arc<Mutex<Vec<Vec<i64>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = published.clone();
        let _handle = processor.on_event(move |event| {
            if let TopicEvent::Updated { items, .. } = event {
                sink.lock().push(
                    items
                        .iter()
                        .map(|i| i["ts"].as_i64().unwrap())
                        .collect(),
                );
            }
        });

        processor.enqueue_frame(append(&[("c", 3)]));
        processor.enqueue_frame(append(&[("a", 1)]));
        processor.enqueue_frame(append(&[("b", 2)]));
        settle().await;

        let published = published.lock();
        assert_eq!(published.len(), 3);
        // each publish is re-sorted by ordering key
        assert_eq!(published[2], vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_invalidation_reaches_listeners() {
        let processor = TopicProcessor::spawn("m1", KeyRegistry::new());

        let invalidated = Arc::new(Mutex::new(false));
        let flag = invalidated.clone();
        let _handle = processor.on_event(move |event| {
            if matches!(event, TopicEvent::Invalidated) {
                *flag.lock() = true;
            }
        });

        processor.enqueue_frame(append(&[("a", 1)]));
        processor.enqueue_truncate();
        settle().await;

        assert!(*invalidated.lock());
    }

    #[tokio::test]
    async fn test_kind_filtered_listener() {
        let processor = TopicProcessor::spawn("m1", KeyRegistry::new());

        let hits = Arc::new(Mutex::new(0usize));
        let counter = hits.clone();
        let _handle = processor.on_kind("activity", move |_items| {
            *counter.lock() += 1;
        });

        processor.enqueue_frame(append(&[("a", 1)]));

        let mut other = append(&[("b", 2)]);
        other.kind = "documents".to_string();
        processor.enqueue_frame(other);
        settle().await;

        assert_eq!(*hits.lock(), 1);
    }
}
