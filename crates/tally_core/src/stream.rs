//! Hot event streams
//!
//! An [`EventStream<T>`] is a multicast channel living on the UI thread.
//! Values emitted on it are delivered synchronously to every subscriber that
//! is registered *at emission time*. There is no buffering and no replay:
//! subscribing late yields only future values.
//!
//! Subscribing returns a [`Subscription`] guard. Dropping the guard (or
//! calling [`Subscription::dispose`]) removes the handler. A
//! [`SubscriptionBag`] groups many guards so they can be torn down together,
//! which is how a merged subscription over a changing set of sources is
//! replaced wholesale.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tally_core::stream::EventStream;
//!
//! let clicks = EventStream::<u32>::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let seen_clone = Rc::clone(&seen);
//!
//! let sub = clicks.subscribe(move |v| seen_clone.borrow_mut().push(*v));
//! clicks.emit(1);
//! drop(sub);
//! clicks.emit(2);
//!
//! assert_eq!(*seen.borrow(), vec![1]);
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Identifier of one subscriber on one stream
    pub struct SubscriberId;
}

type Handler<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct StreamInner<T> {
    subscribers: SlotMap<SubscriberId, Handler<T>>,
    /// Number of values emitted over the stream's lifetime
    emitted: u64,
}

/// A hot, single-threaded multicast stream
pub struct EventStream<T> {
    inner: Rc<RefCell<StreamInner<T>>>,
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for EventStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventStream")
            .field("subscribers", &inner.subscribers.len())
            .field("emitted", &inner.emitted)
            .finish()
    }
}

impl<T: 'static> EventStream<T> {
    /// Create a stream with no subscribers
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StreamInner {
                subscribers: SlotMap::with_key(),
                emitted: 0,
            })),
        }
    }

    /// Register a handler for future values
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&T) + 'static,
    {
        let handler: Handler<T> = Rc::new(RefCell::new(handler));
        let id = self.inner.borrow_mut().subscribers.insert(handler);
        let weak: Weak<RefCell<StreamInner<T>>> = Rc::downgrade(&self.inner);

        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().subscribers.remove(id);
            }
        })
    }

    /// Deliver a value to every current subscriber
    ///
    /// Handlers may subscribe, unsubscribe, or emit on other streams while
    /// running. A handler that re-enters itself through a feedback loop is
    /// skipped for the nested value.
    pub fn emit(&self, value: T) {
        // Snapshot so handlers can mutate the subscriber list.
        let handlers: SmallVec<[(SubscriberId, Handler<T>); 4]> = {
            let mut inner = self.inner.borrow_mut();
            inner.emitted += 1;
            inner
                .subscribers
                .iter()
                .map(|(id, h)| (id, Rc::clone(h)))
                .collect()
        };

        for (id, handler) in handlers {
            // Skip handlers removed by an earlier handler in this dispatch.
            if !self.inner.borrow().subscribers.contains_key(id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut run) => (&mut *run)(&value),
                Err(_) => tracing::trace!("EventStream: skipping re-entrant handler"),
            }
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Number of values emitted so far
    pub fn emitted_count(&self) -> u64 {
        self.inner.borrow().emitted
    }
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

/// Guard for one registered handler; disposes on drop
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a teardown action
    pub fn new<F: FnOnce() + 'static>(dispose: F) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription that owns nothing
    pub fn empty() -> Self {
        Self { dispose: None }
    }

    /// Unsubscribe now
    pub fn dispose(mut self) {
        self.run_dispose();
    }

    /// Whether teardown is still pending
    pub fn is_active(&self) -> bool {
        self.dispose.is_some()
    }

    fn run_dispose(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A group of subscriptions disposed together
#[derive(Debug, Default)]
pub struct SubscriptionBag {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Dispose every subscription in the bag, leaving it empty
    pub fn clear(&mut self) {
        for sub in self.subscriptions.drain(..) {
            sub.dispose();
        }
    }
}

impl Extend<Subscription> for SubscriptionBag {
    fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
        self.subscriptions.extend(iter);
    }
}

/// Merge many source streams into one sink stream
///
/// Each source value is passed through its paired mapper; `Some` results are
/// forwarded to `sink`, `None` results are dropped. The returned bag owns one
/// subscription per source.
pub fn merge_into<S, T, F, I>(sources: I, sink: &EventStream<T>) -> SubscriptionBag
where
    S: 'static,
    T: 'static,
    F: FnMut(&S) -> Option<T> + 'static,
    I: IntoIterator<Item = (EventStream<S>, F)>,
{
    let mut bag = SubscriptionBag::new();
    for (source, mut mapper) in sources {
        let sink = sink.clone();
        bag.push(source.subscribe(move |value| {
            if let Some(mapped) = mapper(value) {
                sink.emit(mapped);
            }
        }));
    }
    bag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>(stream: &EventStream<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let sub = stream.subscribe(move |v: &T| seen_clone.borrow_mut().push(v.clone()));
        (seen, sub)
    }

    #[test]
    fn test_emit_reaches_all_subscribers() {
        let stream = EventStream::<i32>::new();
        let (a, _sa) = recorder(&stream);
        let (b, _sb) = recorder(&stream);

        stream.emit(7);

        assert_eq!(*a.borrow(), vec![7]);
        assert_eq!(*b.borrow(), vec![7]);
        assert_eq!(stream.emitted_count(), 1);
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let stream = EventStream::<i32>::new();
        stream.emit(1);

        let (seen, _sub) = recorder(&stream);
        assert!(seen.borrow().is_empty());

        stream.emit(2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let stream = EventStream::<i32>::new();
        let (seen, sub) = recorder(&stream);
        assert_eq!(stream.subscriber_count(), 1);

        drop(sub);
        stream.emit(3);

        assert_eq!(stream.subscriber_count(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_bag_clear_disposes_all() {
        let stream = EventStream::<i32>::new();
        let mut bag = SubscriptionBag::new();
        bag.push(stream.subscribe(|_| {}));
        bag.push(stream.subscribe(|_| {}));
        assert_eq!(stream.subscriber_count(), 2);

        bag.clear();

        assert!(bag.is_empty());
        assert_eq!(stream.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_may_unsubscribe_other_during_emit() {
        let stream = EventStream::<i32>::new();
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim_clone = Rc::clone(&victim);

        let _killer = stream.subscribe(move |_| {
            victim_clone.borrow_mut().take();
        });
        let (seen, sub) = recorder(&stream);
        *victim.borrow_mut() = Some(sub);

        stream.emit(1);

        assert!(seen.borrow().is_empty());
        assert_eq!(stream.subscriber_count(), 1);
    }

    #[test]
    fn test_merge_filters_and_forwards() {
        let a = EventStream::<i32>::new();
        let b = EventStream::<i32>::new();
        let sink = EventStream::<String>::new();
        let (seen, _sub) = recorder(&sink);

        let bag = merge_into(
            vec![
                (a.clone(), Box::new(|v: &i32| Some(format!("a{v}"))) as Box<dyn FnMut(&i32) -> Option<String>>),
                (b.clone(), Box::new(|v: &i32| (*v > 0).then(|| format!("b{v}")))),
            ],
            &sink,
        );

        a.emit(1);
        b.emit(-1);
        b.emit(2);
        assert_eq!(*seen.borrow(), vec!["a1".to_string(), "b2".to_string()]);

        drop(bag);
        a.emit(5);
        assert_eq!(seen.borrow().len(), 2);
    }
}
