//! Small callback registry shared by the auth provider and the session resolver.

use std::sync::Arc;

use parking_lot::Mutex;

pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

struct ListenerSet<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

pub(crate) struct Listeners<T> {
    inner: Arc<Mutex<ListenerSet<T>>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self { inner: Arc::new(Mutex::new(ListenerSet { next_id: 0, entries: Vec::new() })) }
    }
}

impl<T: Clone + 'static> Listeners<T> {
    pub(crate) fn add(&self, cb: Callback<T>) -> Subscription {
        let id = {
            let mut set = self.inner.lock();
            set.next_id += 1;
            let id = set.next_id;
            set.entries.push((id, cb));
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || match weak.upgrade() {
            Some(set) => {
                let mut set = set.lock();
                let before = set.entries.len();
                set.entries.retain(|(eid, _)| *eid != id);
                set.entries.len() != before
            }
            None => false,
        })
    }

    /// Invoke every registered callback. Callbacks run without the registry lock held,
    /// so they may subscribe or unsubscribe re-entrantly.
    pub(crate) fn emit(&self, value: T) {
        let callbacks: Vec<Callback<T>> = self.inner.lock().entries.iter().map(|(_, cb)| cb.clone()).collect();
        for cb in callbacks {
            cb(value.clone());
        }
    }

    pub(crate) fn len(&self) -> usize { self.inner.lock().entries.len() }
}

/// Handle returned by every `subscribe`. Dropping it leaves the callback registered.
#[must_use = "call unsubscribe() to detach the callback"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() -> bool + Send>>,
}

impl Subscription {
    fn new<F: FnOnce() -> bool + Send + 'static>(f: F) -> Self { Self { detach: Some(Box::new(f)) } }

    /// Detach the callback. Returns false when it was already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.detach.take().map(|f| f()).unwrap_or(false)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("attached", &self.detach.is_some()).finish()
    }
}
