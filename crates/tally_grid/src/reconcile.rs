//! Identity-preserving reconciliation of grid data against live widgets
//!
//! The pool maps each equality class of item to the one widget showing it.
//! Setting a new grid walks the flattened items:
//!
//! - an item equal to a pooled one takes over that widget, and the pool key
//!   is replaced by the new value so later configuration sees the newest
//!   fields
//! - an item with no equal in the pool gets a fresh widget from the factory
//! - pooled widgets whose items are gone are handed back to the factory for
//!   destruction
//!
//! Items repeated within one grid collapse onto a single widget; the last
//! repeat's value becomes the key, and the entry keeps the position of the
//! first repeat.

use indexmap::IndexMap;
use tally_core::Subscription;

use crate::button::Button;
use crate::GridItem;

/// A pooled widget plus the subscriptions that live exactly as long as it
#[derive(Debug)]
pub struct WidgetEntry {
    pub button: Button,
    /// Long-press forwarding, installed once at creation
    pub long_press: Subscription,
}

impl WidgetEntry {
    pub fn new(button: Button, long_press: Subscription) -> Self {
        Self { button, long_press }
    }
}

/// Item-to-widget map, in first-appearance order of the current grid
pub type Pool<T> = IndexMap<T, WidgetEntry>;

/// Creates and destroys widgets on behalf of [`reconcile`]
pub trait WidgetFactory<T> {
    /// Build, attach, and wire a widget for a new item
    fn create(&mut self, item: &T) -> WidgetEntry;

    /// Tear down a widget whose item left the grid
    fn destroy(&mut self, item: T, entry: WidgetEntry);
}

/// Outcome of one reconciliation
#[derive(Debug)]
pub struct Reconciliation<T> {
    pub pool: Pool<T>,
    /// Widgets created for items that had no equal in the old pool
    pub created: Vec<Button>,
    /// Widgets handed to [`WidgetFactory::destroy`]
    pub destroyed: Vec<Button>,
    /// Number of widgets carried over from the old pool
    pub reused: usize,
    /// Items that collapsed onto an earlier equal item
    pub collapsed: usize,
}

/// Diff `grid` against `old` and produce the new pool
pub fn reconcile<T, F>(mut old: Pool<T>, grid: &[Vec<T>], factory: &mut F) -> Reconciliation<T>
where
    T: GridItem,
    F: WidgetFactory<T>,
{
    let capacity = grid.iter().map(Vec::len).sum();
    let mut pool: Pool<T> = IndexMap::with_capacity(capacity);
    let mut created = Vec::new();
    let mut reused = 0;
    let mut collapsed = 0;

    for item in grid.iter().flatten() {
        if let Some((index, _, entry)) = pool.shift_remove_full(item) {
            pool.shift_insert(index, item.clone(), entry);
            collapsed += 1;
        } else if let Some((_, entry)) = old.swap_remove_entry(item) {
            pool.insert(item.clone(), entry);
            reused += 1;
        } else {
            let entry = factory.create(item);
            created.push(entry.button.clone());
            pool.insert(item.clone(), entry);
        }
    }

    let mut destroyed = Vec::with_capacity(old.len());
    for (item, entry) in old {
        destroyed.push(entry.button.clone());
        factory.destroy(item, entry);
    }

    tracing::debug!(
        "reconcile: {} created, {} reused, {} destroyed, {} collapsed",
        created.len(),
        reused,
        destroyed.len(),
        collapsed
    );

    Reconciliation {
        pool,
        created,
        destroyed,
        reused,
        collapsed,
    }
}
