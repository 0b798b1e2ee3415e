/// Per-topic merged state: domain-level dedup and append/replace merge
///
/// This is the pure core of the update processor. It owns the merged
/// collection for one topic, the no-TTL dedup key set and the
/// baseline-initialized flag; the async worker in `processor` drives it one
/// event at a time so every mutation happens synchronously in one turn.
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::realtime::message::{UpdateAction, UpdateFrame};

// ============================================================================
// KEY EXTRACTION
// ============================================================================

/// Pluggable dedup key extraction, supplied per update kind by the
/// collaborator that defines that kind
///
/// Returning None falls back to the composite legacy key (ordering key +
/// kind + truncated summary text). Prefer emitting a true unique identifier:
/// the composite can in theory collide for two distinct events with identical
/// timestamps and truncated content.
pub trait KeyStrategy: Send + Sync {
    fn key(&self, item: &Value) -> Option<String>;
}

/// Default strategy: the item's authoritative `id` field
pub struct IdKeyStrategy;

impl KeyStrategy for IdKeyStrategy {
    fn key(&self, item: &Value) -> Option<String> {
        item.get("id").and_then(|v| v.as_str()).map(|s| s.to_string())
    }
}

/// Per-kind strategy registry with the `id` default
pub struct KeyRegistry {
    by_kind: HashMap<String, Arc<dyn KeyStrategy>>,
    default: Arc<dyn KeyStrategy>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self {
            by_kind: HashMap::new(),
            default: Arc::new(IdKeyStrategy),
        }
    }

    /// Install a strategy for one update kind
    pub fn register(&mut self, kind: impl Into<String>, strategy: Arc<dyn KeyStrategy>) {
        self.by_kind.insert(kind.into(), strategy);
    }

    fn strategy_for(&self, kind: &str) -> &Arc<dyn KeyStrategy> {
        self.by_kind.get(kind).unwrap_or(&self.default)
    }

    /// Dedup key for an item: authoritative key if the strategy yields one,
    /// otherwise the composite fallback
    pub fn key_for(&self, kind: &str, item: &Value, ordering_key: i64) -> String {
        if let Some(key) = self.strategy_for(kind).key(item) {
            return key;
        }
        composite_key(kind, item, ordering_key)
    }
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields sampled by the composite fallback key
const SUMMARY_FIELDS: [&str; 2] = ["title", "summary"];
const SUMMARY_TRUNC: usize = 24;

fn composite_key(kind: &str, item: &Value, ordering_key: i64) -> String {
    let mut key = format!("{}|{}", ordering_key, kind);
    for field in SUMMARY_FIELDS {
        let text = item.get(field).and_then(|v| v.as_str()).unwrap_or("");
        let truncated: String = text.chars().take(SUMMARY_TRUNC).collect();
        key.push('|');
        key.push_str(&truncated);
    }
    key
}

// ============================================================================
// TOPIC STATE
// ============================================================================

/// Result of applying one update event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The merged collection changed
    Changed { added: usize },
    /// Every incoming item was a duplicate
    Unchanged,
}

/// Merged state for one topic subscription
pub struct TopicState {
    items: Vec<Value>,
    seen: HashSet<String>,
    baseline_seeded: bool,
    keys: KeyRegistry,
}

impl TopicState {
    pub fn new(keys: KeyRegistry) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            baseline_seeded: false,
            keys,
        }
    }

    /// Current merged collection, ordered by ordering key
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn is_baseline_seeded(&self) -> bool {
        self.baseline_seeded
    }

    /// Install already-known state (e.g. from an initial request/response
    /// fetch). Does not seed the dedup set; seeding stays lazy and happens on
    /// the first incremental event.
    pub fn set_baseline(&mut self, items: Vec<Value>) {
        self.items = items;
        self.sort_items();
    }

    /// Apply one update frame to the merged state
    pub fn apply(&mut self, frame: &UpdateFrame) -> MergeOutcome {
        let incoming = items_of(frame);
        match frame.action {
            UpdateAction::Replace => self.apply_replace(&frame.kind, incoming, frame.ts),
            UpdateAction::Append => self.apply_append(&frame.kind, incoming, frame.ts),
        }
    }

    /// Full replace: the new collection is the whole state and re-seeds the
    /// dedup set
    fn apply_replace(&mut self, kind: &str, incoming: Vec<Value>, frame_ts: Option<i64>) -> MergeOutcome {
        self.seen.clear();
        for item in &incoming {
            let key = self.keys.key_for(kind, item, ordering_key(item, frame_ts));
            self.seen.insert(key);
        }
        let added = incoming.len();
        self.items = incoming;
        self.baseline_seeded = true;
        self.sort_items();
        MergeOutcome::Changed { added }
    }

    /// Incremental append with one-time lazy baseline seeding
    fn apply_append(&mut self, kind: &str, incoming: Vec<Value>, frame_ts: Option<i64>) -> MergeOutcome {
        if !self.baseline_seeded {
            if !self.items.is_empty() {
                let existing: Vec<String> = self
                    .items
                    .iter()
                    .map(|item| self.keys.key_for(kind, item, ordering_key(item, None)))
                    .collect();
                self.seen.extend(existing);
            }
            self.baseline_seeded = true;
        }

        let mut added = 0;
        for item in incoming {
            let key = self.keys.key_for(kind, &item, ordering_key(&item, frame_ts));
            if self.seen.contains(&key) {
                continue;
            }
            self.seen.insert(key);
            self.items.push(item);
            added += 1;
        }

        if added == 0 {
            return MergeOutcome::Unchanged;
        }
        self.sort_items();
        MergeOutcome::Changed { added }
    }

    /// Invalidation: incremental state is no longer trustworthy. Clears the
    /// dedup set, the baseline flag and the collection; the application must
    /// re-fetch authoritative state over the request/response API.
    pub fn truncate(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.baseline_seeded = false;
    }

    /// Stable re-sort by ordering key (equal keys keep arrival order)
    fn sort_items(&mut self) {
        self.items.sort_by_key(|item| ordering_key(item, None));
    }
}

/// Ordering key of an item: its own `ts`, else the frame's, else 0
fn ordering_key(item: &Value, frame_ts: Option<i64>) -> i64 {
    item.get("ts")
        .and_then(|v| v.as_i64())
        .or(frame_ts)
        .unwrap_or(0)
}

/// An update frame's payload as a list of items
fn items_of(frame: &UpdateFrame) -> Vec<Value> {
    match &frame.data {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        single => vec![single.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(action: UpdateAction, data: Value) -> UpdateFrame {
        UpdateFrame {
            topic_id: "m1".to_string(),
            kind: "activity".to_string(),
            action,
            ts: None,
            data,
        }
    }

    fn append(data: Value) -> UpdateFrame {
        frame(UpdateAction::Append, data)
    }

    fn state() -> TopicState {
        TopicState::new(KeyRegistry::new())
    }

    #[test]
    fn test_replace_wins_over_prior_appends() {
        let mut s = state();

        s.apply(&append(json!([{"id": "a", "ts": 1}])));
        s.apply(&append(json!([{"id": "b", "ts": 2}])));
        s.apply(&append(json!([{"id": "c", "ts": 3}])));

        let replacement = json!([{"id": "x", "ts": 9}]);
        s.apply(&frame(UpdateAction::Replace, replacement.clone()));

        assert_eq!(s.items(), replacement.as_array().unwrap().as_slice());
    }

    #[test]
    fn test_duplicate_identifier_kept_once() {
        let mut s = state();

        s.apply(&append(json!([{"id": "a", "ts": 1}])));
        let outcome = s.apply(&append(json!([{"id": "a", "ts": 1}])));

        assert_eq!(outcome, MergeOutcome::Unchanged);
        assert_eq!(s.items().len(), 1);
    }

    #[test]
    fn test_sorted_by_ordering_key() {
        let mut s = state();

        s.apply(&append(json!([
            {"id": "c", "ts": 3},
            {"id": "a", "ts": 1},
            {"id": "b", "ts": 2}
        ])));

        let order: Vec<i64> = s
            .items()
            .iter()
            .map(|item| item["ts"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_baseline_seeding_filters_known_items() {
        let mut s = state();
        s.set_baseline(vec![json!({"id": "old", "ts": 1})]);
        assert!(!s.is_baseline_seeded());

        // first incremental event seeds the set from existing state, so the
        // already-known item is discarded
        let outcome = s.apply(&append(json!([
            {"id": "old", "ts": 1},
            {"id": "new", "ts": 2}
        ])));

        assert!(s.is_baseline_seeded());
        assert_eq!(outcome, MergeOutcome::Changed { added: 1 });
        assert_eq!(s.items().len(), 2);
    }

    #[test]
    fn test_truncate_clears_dedup_state() {
        let mut s = state();
        s.apply(&append(json!([{"id": "a", "ts": 1}])));

        s.truncate();
        assert!(!s.is_baseline_seeded());
        assert!(s.items().is_empty());

        // previously-seen identifier is accepted again
        let outcome = s.apply(&append(json!([{"id": "a", "ts": 1}])));
        assert_eq!(outcome, MergeOutcome::Changed { added: 1 });
    }

    #[test]
    fn test_composite_fallback_key() {
        let mut s = state();

        // no id field: key falls back to ts + kind + truncated summary text
        s.apply(&append(json!([{"ts": 5, "title": "step finished"}])));
        let outcome = s.apply(&append(json!([{"ts": 5, "title": "step finished"}])));
        assert_eq!(outcome, MergeOutcome::Unchanged);

        // different title under the same ts is a distinct event
        let outcome = s.apply(&append(json!([{"ts": 5, "title": "another step"}])));
        assert_eq!(outcome, MergeOutcome::Changed { added: 1 });
    }

    #[test]
    fn test_custom_key_strategy() {
        struct SigKey;
        impl KeyStrategy for SigKey {
            fn key(&self, item: &Value) -> Option<String> {
                item.get("sig").and_then(|v| v.as_str()).map(|s| s.to_string())
            }
        }

        let mut keys = KeyRegistry::new();
        keys.register("activity", Arc::new(SigKey));
        let mut s = TopicState::new(keys);

        s.apply(&append(json!([{"sig": "s1", "ts": 1}])));
        let outcome = s.apply(&append(json!([{"sig": "s1", "ts": 2}])));
        assert_eq!(outcome, MergeOutcome::Unchanged);
    }
}
