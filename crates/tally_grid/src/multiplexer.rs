//! Merged event streams over the live widget set
//!
//! Callers subscribe once to `selection` and `long_press` and keep receiving
//! `(button, item)` pairs while the set of widgets underneath changes.
//!
//! Tap forwarding is rebuilt from the pool after every reconciliation, with
//! the previous forwarding disposed first so a widget never reports twice.
//! Long-press forwarding is installed per widget at creation and lives in the
//! widget's pool entry. Both paths resolve the item through a lookup against
//! the *current* pool at emit time, so events from widgets that have left the
//! pool are dropped.

use std::fmt;
use std::rc::Rc;

use tally_core::{merge_into, EventStream, Subscription, SubscriptionBag};

use crate::button::Button;
use crate::reconcile::Pool;
use crate::tree::WidgetId;
use crate::GridItem;

/// Resolve a widget to the item it currently shows
pub type ItemLookup<T> = Rc<dyn Fn(WidgetId) -> Option<T>>;

/// Fan-in of per-widget gestures into two grid-level streams
pub struct EventMultiplexer<T: 'static> {
    selection: EventStream<(Button, T)>,
    long_press: EventStream<(Button, T)>,
    taps: SubscriptionBag,
    rebuilds: u64,
}

impl<T: GridItem> Default for EventMultiplexer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GridItem> EventMultiplexer<T> {
    pub fn new() -> Self {
        Self {
            selection: EventStream::new(),
            long_press: EventStream::new(),
            taps: SubscriptionBag::new(),
            rebuilds: 0,
        }
    }

    /// Taps on any live widget
    pub fn selection(&self) -> &EventStream<(Button, T)> {
        &self.selection
    }

    /// Long presses (began only) on any live widget
    pub fn long_press(&self) -> &EventStream<(Button, T)> {
        &self.long_press
    }

    /// Replace tap forwarding with one subscription per pooled widget
    pub fn rebuild(&mut self, pool: &Pool<T>, lookup: ItemLookup<T>) {
        self.taps.clear();

        let sources = pool.values().map(|entry| {
            let weak = entry.button.downgrade();
            let id = entry.button.id();
            let lookup = Rc::clone(&lookup);
            let forward = move |_: &()| {
                let button = weak.upgrade()?;
                match lookup(id) {
                    Some(item) => Some((button, item)),
                    None => {
                        tracing::trace!("EventMultiplexer: dropping tap from stale widget {:?}", id);
                        None
                    }
                }
            };
            (entry.button.taps().clone(), forward)
        });

        self.taps = merge_into(sources, &self.selection);
        self.rebuilds += 1;
    }

    /// Forward one widget's long presses; owned by its pool entry
    pub fn watch_long_press(&self, button: &Button, lookup: ItemLookup<T>) -> Subscription {
        let weak = button.downgrade();
        let id = button.id();
        let sink = self.long_press.clone();

        button.long_presses().subscribe(move |_| {
            let Some(button) = weak.upgrade() else {
                return;
            };
            match lookup(id) {
                Some(item) => sink.emit((button, item)),
                None => {
                    tracing::trace!("EventMultiplexer: dropping long press from stale widget {:?}", id)
                }
            }
        })
    }

    /// Dispose all tap forwarding
    pub fn clear(&mut self) {
        self.taps.clear();
    }

    /// Live tap subscriptions (one per pooled widget)
    pub fn tap_subscription_count(&self) -> usize {
        self.taps.len()
    }

    /// Number of rebuilds so far
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}

impl<T: 'static> fmt::Debug for EventMultiplexer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventMultiplexer")
            .field("taps", &self.taps.len())
            .field("rebuilds", &self.rebuilds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::WidgetEntry;
    use crate::tree::WidgetTree;
    use std::cell::RefCell;
    use std::time::{Duration, Instant};

    type Shared = Rc<RefCell<Pool<&'static str>>>;

    fn lookup(pool: &Shared) -> ItemLookup<&'static str> {
        let pool = Rc::clone(pool);
        Rc::new(move |id: WidgetId| {
            pool.borrow()
                .iter()
                .find(|(_, e)| e.button.id() == id)
                .map(|(k, _)| *k)
        })
    }

    fn record(
        stream: &EventStream<(Button, &'static str)>,
    ) -> (Rc<RefCell<Vec<&'static str>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let sub = stream.subscribe(move |(_, item)| s.borrow_mut().push(*item));
        (seen, sub)
    }

    #[test]
    fn test_selection_reports_item() {
        let mut tree = WidgetTree::new();
        let mut mux = EventMultiplexer::new();
        let pool: Shared = Rc::default();
        let a = tree.attach_with(Button::new);
        let b = tree.attach_with(Button::new);
        pool.borrow_mut().insert("a", WidgetEntry::new(a.clone(), Subscription::empty()));
        pool.borrow_mut().insert("b", WidgetEntry::new(b.clone(), Subscription::empty()));

        let (seen, _sub) = record(mux.selection());
        mux.rebuild(&pool.borrow(), lookup(&pool));

        b.tap();
        a.tap();
        assert_eq!(*seen.borrow(), vec!["b", "a"]);
        assert_eq!(mux.tap_subscription_count(), 2);
    }

    #[test]
    fn test_rebuild_disposes_previous() {
        let mut tree = WidgetTree::new();
        let mut mux = EventMultiplexer::new();
        let pool: Shared = Rc::default();
        let a = tree.attach_with(Button::new);
        pool.borrow_mut().insert("a", WidgetEntry::new(a.clone(), Subscription::empty()));

        let (seen, _sub) = record(mux.selection());
        mux.rebuild(&pool.borrow(), lookup(&pool));
        mux.rebuild(&pool.borrow(), lookup(&pool));

        a.tap();
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(a.taps().subscriber_count(), 1);
        assert_eq!(mux.rebuild_count(), 2);
    }

    #[test]
    fn test_removed_widget_tap_is_dropped() {
        let mut tree = WidgetTree::new();
        let mut mux = EventMultiplexer::new();
        let pool: Shared = Rc::default();
        let a = tree.attach_with(Button::new);
        let b = tree.attach_with(Button::new);
        pool.borrow_mut().insert("a", WidgetEntry::new(a.clone(), Subscription::empty()));
        pool.borrow_mut().insert("b", WidgetEntry::new(b.clone(), Subscription::empty()));

        let (seen, _sub) = record(mux.selection());
        mux.rebuild(&pool.borrow(), lookup(&pool));

        // Leaves the pool before forwarding is rebuilt
        pool.borrow_mut().shift_remove("a");
        a.tap();
        assert!(seen.borrow().is_empty());

        mux.rebuild(&pool.borrow(), lookup(&pool));
        a.tap();
        b.tap();
        assert_eq!(*seen.borrow(), vec!["b"]);
        assert_eq!(a.taps().subscriber_count(), 0);
    }

    #[test]
    fn test_long_press_forwarding() {
        let mut tree = WidgetTree::new();
        let mux = EventMultiplexer::new();
        let pool: Shared = Rc::default();
        let a = tree.attach_with(Button::new);
        a.add_long_press_recognizer(Duration::from_millis(230));
        let watch = mux.watch_long_press(&a, lookup(&pool));
        pool.borrow_mut().insert("a", WidgetEntry::new(a.clone(), watch));

        let (seen, _sub) = record(mux.long_press());
        let t0 = Instant::now();
        a.press_down(t0);
        a.poll_press(t0 + Duration::from_millis(300));
        a.press_up(t0 + Duration::from_millis(400));

        assert_eq!(*seen.borrow(), vec!["a"]);

        // Dropping the entry drops the forwarding
        pool.borrow_mut().clear();
        assert_eq!(a.long_presses().subscriber_count(), 0);
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let mut tree = WidgetTree::new();
        let mut mux = EventMultiplexer::new();
        let pool: Shared = Rc::default();
        let a = tree.attach_with(Button::new);
        pool.borrow_mut().insert("a", WidgetEntry::new(a.clone(), Subscription::empty()));
        mux.rebuild(&pool.borrow(), lookup(&pool));

        a.tap();
        let (seen, _sub) = record(mux.selection());
        assert!(seen.borrow().is_empty());
    }
}
