use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use parking_lot::Mutex;
use tracing::error;

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct NotifierInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

/// Payload-free fan-out: every registered callback runs once per `notify`,
/// in registration order. Listeners re-read whatever state they care about.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    inner: Arc<NotifierInner>,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            notifier: Arc::downgrade(&self.inner),
        }
    }

    /// Calls every listener registered at the time of the call.
    ///
    /// The listener list is copied before invoking, so a listener may add or
    /// remove listeners without deadlocking; removals apply from the next call.
    pub fn notify(&self) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| (*listener)())).is_err() {
                error!("change listener panicked");
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

/// Deregisters a listener. Dropping the handle leaves the listener in place.
#[derive(Debug)]
pub struct ListenerHandle {
    id: u64,
    notifier: Weak<NotifierInner>,
}

impl ListenerHandle {
    pub fn remove(&self) {
        if let Some(inner) = self.notifier.upgrade() {
            inner.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
#[path = "tests/notifier_tests.rs"]
mod tests;
