use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::warn;

/// A notification that can travel over an [`EventBus`].
///
/// The name is the stable external contract subscribers key on
/// (for example `map-click`); the payload is whatever the implementing type
/// carries.
pub trait Notification {
    fn name(&self) -> &'static str;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

type Callback<E> = Rc<RefCell<dyn FnMut(&E)>>;

struct Subscriber<E> {
    id: SubscriptionId,
    /// `None` receives every notification.
    filter: Option<&'static str>,
    callback: Callback<E>,
}

/// Single-threaded publish/subscribe channel with an ordered emission log.
///
/// Ordering contract:
/// - Subscribers are invoked in subscription order.
/// - Each `emit` call delivers exactly once to each subscriber that matched
///   when the emit started.
/// - The log records notification names in emission order until drained.
///
/// Every method takes `&self` and no internal borrow is held while a
/// callback runs, so callbacks may subscribe, unsubscribe or emit on the
/// same bus. A subscription added during an emit sees the next emit. A
/// callback that re-enters itself through a nested emit is skipped for the
/// nested notification.
pub struct EventBus<E> {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<Subscriber<E>>>,
    log: RefCell<Vec<&'static str>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
            log: RefCell::new(Vec::new()),
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("log", &*self.log.borrow())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl<E: Notification> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every notification.
    pub fn subscribe(&self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        self.insert(None, Rc::new(RefCell::new(callback)))
    }

    /// Subscribe to notifications with the given name only.
    pub fn subscribe_to(
        &self,
        name: &'static str,
        callback: impl FnMut(&E) + 'static,
    ) -> SubscriptionId {
        self.insert(Some(name), Rc::new(RefCell::new(callback)))
    }

    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn emit(&self, event: E) {
        let name = event.name();
        self.log.borrow_mut().push(name);
        let targets: Vec<(SubscriptionId, Callback<E>)> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.filter.is_none_or(|f| f == name))
            .map(|s| (s.id, Rc::clone(&s.callback)))
            .collect();
        for (id, callback) in targets {
            match callback.try_borrow_mut() {
                Ok(mut callback) => (&mut *callback)(&event),
                Err(_) => warn!(subscription = id.0, event = name, "skipping re-entrant subscriber"),
            }
        }
    }

    /// Names of emitted notifications, oldest first.
    pub fn emitted(&self) -> Vec<&'static str> {
        self.log.borrow().clone()
    }

    pub fn count_emitted(&self, name: &str) -> usize {
        self.log.borrow().iter().filter(|n| **n == name).count()
    }

    pub fn drain(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    fn insert(&self, filter: Option<&'static str>, callback: Callback<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            filter,
            callback,
        });
        id
    }
}
