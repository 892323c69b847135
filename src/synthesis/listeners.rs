//! Speaking-state subscriber registry

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// Opaque handle returned when a listener is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(u64);

type SpeakingCallback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, SpeakingCallback)>,
}

/// Shared list of speaking-state callbacks; clones see the same list
#[derive(Clone, Default)]
pub struct SpeakingListeners {
    inner: Arc<Mutex<Registry>>,
}

impl SpeakingListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`, called with the new state on every change
    pub fn add(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> ListenerId {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener; unknown or already removed ids are fine
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(existing, _)| *existing != id);
        registry.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener with `speaking`
    pub fn notify(&self, speaking: bool) {
        // Snapshot first so a listener may add or remove listeners
        let listeners: Vec<SpeakingCallback> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(speaking);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SpeakingListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeakingListeners")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<bool>>>, impl Fn(bool) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |speaking| sink.lock().unwrap().push(speaking))
    }

    #[test]
    fn test_every_listener_is_notified() {
        let listeners = SpeakingListeners::new();
        let (first, f1) = recorder();
        let (second, f2) = recorder();
        listeners.add(f1);
        listeners.add(f2);

        listeners.notify(true);
        listeners.notify(false);

        assert_eq!(*first.lock().unwrap(), vec![true, false]);
        assert_eq!(*second.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let listeners = SpeakingListeners::new();
        let (seen, f) = recorder();
        let id = listeners.add(f);

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        assert!(!listeners.remove(ListenerId(999)));
        assert!(listeners.is_empty());

        listeners.notify(true);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let listeners = SpeakingListeners::new();
        let handle = listeners.clone();
        let own_id = Arc::new(Mutex::new(None));
        let id_slot = Arc::clone(&own_id);

        let id = listeners.add(move |_| {
            if let Some(id) = *id_slot.lock().unwrap() {
                handle.remove(id);
            }
        });
        *own_id.lock().unwrap() = Some(id);

        listeners.notify(true);
        assert!(listeners.is_empty());
    }
}
