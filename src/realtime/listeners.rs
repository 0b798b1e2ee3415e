/// Multi-subscriber listener sets with disposer handles
///
/// Any number of components can register a callback for the same event
/// stream; registration returns a handle whose drop (or explicit dispose)
/// removes the callback. There is no "latest caller wins" slot anywhere.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A set of callbacks sharing one event type
pub struct ListenerSet<E> {
    inner: Mutex<HashMap<u64, Callback<E>>>,
    next_id: AtomicU64,
}

impl<E> ListenerSet<E> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a callback; the returned handle deregisters it on drop
    pub fn add(self: &Arc<Self>, callback: impl Fn(&E) + Send + Sync + 'static) -> ListenerHandle<E> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.lock().insert(id, Arc::new(callback));
        ListenerHandle {
            set: Arc::downgrade(self),
            id,
        }
    }

    /// Invoke every registered callback
    ///
    /// Callbacks are cloned out under the lock and run outside it, so a
    /// callback may itself register or dispose listeners.
    pub fn emit(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = self.inner.lock().values().cloned().collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn remove(&self, id: u64) {
        self.inner.lock().remove(&id);
    }
}

/// Deregistration handle for one listener
pub struct ListenerHandle<E> {
    set: Weak<ListenerSet<E>>,
    id: u64,
}

impl<E> ListenerHandle<E> {
    /// Explicitly remove the listener (same as dropping the handle)
    pub fn dispose(self) {}
}

impl<E> Drop for ListenerHandle<E> {
    fn drop(&mut self) {
        if let Some(set) = self.set.upgrade() {
            set.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_multiple_listeners_all_fire() {
        let set: Arc<ListenerSet<u32>> = ListenerSet::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c1 = count.clone();
        let _h1 = set.add(move |v| {
            c1.fetch_add(*v as usize, Ordering::SeqCst);
        });
        let c2 = count.clone();
        let _h2 = set.add(move |v| {
            c2.fetch_add(*v as usize, Ordering::SeqCst);
        });

        set.emit(&3);
        assert_eq!(count.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_drop_deregisters() {
        let set: Arc<ListenerSet<u32>> = ListenerSet::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let handle = set.add(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(set.len(), 1);

        drop(handle);
        assert!(set.is_empty());

        set.emit(&1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
