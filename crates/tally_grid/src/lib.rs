//! Tally Button Grid
//!
//! A headless grid of buttons driven by a sectioned list of data items.
//!
//! - **Reconciliation**: equal items keep their button across updates, new
//!   items get a fresh one, departed items have theirs destroyed
//! - **Layout**: buttons flow into wrapped lines, sections start on a new
//!   line, and spare width is shared among the growable buttons of a line
//! - **Events**: one `selection` and one `long_press` stream for the whole
//!   grid, always scoped to the buttons currently shown
//! - **Refresh**: a recurring timer re-runs the caller's configuration so
//!   buttons pick up external state changes
//!
//! Items implement [`GridItem`]. Equality and hashing define identity, so
//! an item may carry display fields (a count, a label) that change without
//! replacing its button.

pub mod button;
pub mod config;
pub mod error;
pub mod gesture;
pub mod grid_view;
pub mod multiplexer;
pub mod reconcile;
pub mod tree;

use std::hash::Hash;

pub use button::{Button, WeakButton};
pub use config::GridConfig;
pub use error::{GridError, Result};
pub use gesture::{GestureState, LongPressRecognizer, PressOutcome};
pub use grid_view::{ButtonGridView, Line};
pub use multiplexer::{EventMultiplexer, ItemLookup};
pub use reconcile::{reconcile, Pool, Reconciliation, WidgetEntry, WidgetFactory};
pub use tree::{WidgetId, WidgetTree};

/// A data item shown as one button in the grid
///
/// `Eq` and `Hash` must agree and should cover only the identifying fields.
pub trait GridItem: Clone + Eq + Hash + 'static {
    /// Keep the fitted width instead of sharing a line's spare width
    fn keep_small(&self) -> bool;
}

impl GridItem for String {
    fn keep_small(&self) -> bool {
        false
    }
}

impl GridItem for &'static str {
    fn keep_small(&self) -> bool {
        false
    }
}
