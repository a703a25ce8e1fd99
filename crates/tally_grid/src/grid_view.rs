//! The button grid view
//!
//! [`ButtonGridView`] owns everything needed to show a sectioned grid of
//! items as buttons:
//!
//! - a pool mapping each item to its button ([`reconcile`](crate::reconcile))
//! - the attached widgets ([`WidgetTree`])
//! - a size cache keyed by widget
//! - merged `selection` / `long_press` streams ([`EventMultiplexer`])
//! - a recurring timer that re-runs the caller's configuration function
//!
//! # Triggers
//!
//! Work happens synchronously in response to three triggers: the caller
//! setting a new grid, the refresh timer, and user gestures on a button. A
//! trigger never runs inside another. A timer tick that fires while the grid
//! is reconciling or laying out is counted as deferred and skipped; the next
//! tick configures as usual. A grid set from inside a pass (for example by
//! the configuration function) is queued and applied when the outermost pass
//! ends. Only the latest queued grid survives, and a grid set by the caller
//! afterwards always wins.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use tally_core::Scheduler;
//! use tally_grid::{ButtonGridView, GridConfig, GridItem};
//!
//! #[derive(Clone, PartialEq, Eq, Hash)]
//! struct Tally(&'static str);
//!
//! impl GridItem for Tally {
//!     fn keep_small(&self) -> bool {
//!         false
//!     }
//! }
//!
//! let scheduler = Scheduler::new(Instant::now());
//! let grid = ButtonGridView::new(GridConfig::default(), &scheduler, |button, item: &Tally| {
//!     button.set_title(Some(item.0));
//! });
//!
//! grid.set_width(320.0);
//! grid.set_buttons(vec![vec![Tally("Coffee"), Tally("Tea")]]);
//! assert_eq!(grid.widget_count(), 2);
//!
//! // One refresh per second re-runs the configuration
//! scheduler.advance_by(Duration::from_secs(1));
//! assert_eq!(grid.tick_count(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tally_core::{EventStream, Point, Scheduler, TimerId};
use tally_layout::{
    FlowItem, FlowLayout, FrameChange, GlobalTextMeasurer, Immediate, LayoutTransition,
    SizeCache, SizeCacheStats, TextMeasurer,
};

use crate::button::Button;
use crate::config::GridConfig;
use crate::multiplexer::{EventMultiplexer, ItemLookup};
use crate::reconcile::{reconcile, Pool, WidgetEntry, WidgetFactory};
use crate::tree::{WidgetId, WidgetTree};
use crate::GridItem;

type Configure<T> = Box<dyn Fn(&Button, &T)>;

/// A laid-out line: the items and buttons on one row, left to right
pub type Line<T> = Vec<(T, Button)>;

/// A sectioned grid of buttons with identity-preserving updates
pub struct ButtonGridView<T: GridItem> {
    shared: Rc<GridShared<T>>,
}

struct GridShared<T: GridItem> {
    state: RefCell<GridState<T>>,
    configure: Configure<T>,
    busy: Cell<bool>,
    ticks: Cell<u64>,
    deferred_ticks: Cell<u64>,
    pending_grid: RefCell<Option<Vec<Vec<T>>>>,
}

struct GridState<T: GridItem> {
    config: GridConfig,
    grid: Vec<Vec<T>>,
    pool: Pool<T>,
    index: FxHashMap<WidgetId, T>,
    tree: WidgetTree,
    sizes: SizeCache<WidgetId>,
    layout: FlowLayout,
    lines: Vec<Line<T>>,
    width: f32,
    content_height: f32,
    needs_layout: bool,
    multiplexer: EventMultiplexer<T>,
    measurer: Arc<dyn TextMeasurer>,
    transition: Box<dyn LayoutTransition<WidgetId>>,
    scheduler: Scheduler,
    timer: Option<TimerId>,
    torn_down: bool,
}

/// Marks the grid busy for the guard's lifetime, restoring the prior value
struct BusyGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> BusyGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(true);
        Self { flag, previous }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// Widget factory used during reconciliation
struct GridFactory<'a, T: GridItem> {
    config: &'a GridConfig,
    tree: &'a mut WidgetTree,
    sizes: &'a mut SizeCache<WidgetId>,
    multiplexer: &'a EventMultiplexer<T>,
    lookup: &'a ItemLookup<T>,
}

impl<T: GridItem> WidgetFactory<T> for GridFactory<'_, T> {
    fn create(&mut self, _item: &T) -> WidgetEntry {
        let button = self.tree.attach_with(Button::new);
        button.set_content_insets(self.config.content_insets());
        button.set_font_size(self.config.font_size);
        button.add_long_press_recognizer(self.config.long_press_duration());

        let long_press = self
            .multiplexer
            .watch_long_press(&button, Rc::clone(self.lookup));
        WidgetEntry::new(button, long_press)
    }

    fn destroy(&mut self, _item: T, entry: WidgetEntry) {
        let id = entry.button.id();
        self.sizes.remove(id);
        self.tree.detach(id);
    }
}

impl<T: GridItem> ButtonGridView<T> {
    /// Create an empty grid and start its refresh timer on `scheduler`
    ///
    /// `configure` paints a button from its item. It runs for every live
    /// button on each layout pass and on each refresh tick.
    pub fn new<F>(config: GridConfig, scheduler: &Scheduler, configure: F) -> Self
    where
        F: Fn(&Button, &T) + 'static,
    {
        if let Err(err) = config.validate() {
            tracing::warn!("ButtonGridView: {}, out-of-range values fall back to defaults", err);
        }
        let shared = Rc::new(GridShared {
            state: RefCell::new(GridState {
                layout: FlowLayout::new(config.flow()),
                sizes: SizeCache::new(config.min_button_width),
                config,
                grid: Vec::new(),
                pool: Pool::default(),
                index: FxHashMap::default(),
                tree: WidgetTree::new(),
                lines: Vec::new(),
                width: 0.0,
                content_height: 0.0,
                needs_layout: false,
                multiplexer: EventMultiplexer::new(),
                measurer: Arc::new(GlobalTextMeasurer),
                transition: Box::new(Immediate),
                scheduler: scheduler.clone(),
                timer: None,
                torn_down: false,
            }),
            configure: Box::new(configure),
            busy: Cell::new(false),
            ticks: Cell::new(0),
            deferred_ticks: Cell::new(0),
            pending_grid: RefCell::new(None),
        });

        let weak: Weak<GridShared<T>> = Rc::downgrade(&shared);
        let period = shared.state.borrow().config.refresh_interval();
        let timer = scheduler.schedule_repeating(period, move |_now| {
            if let Some(shared) = weak.upgrade() {
                shared.tick();
            }
        });
        shared.state.borrow_mut().timer = Some(timer);
        tracing::debug!("ButtonGridView: created, refresh every {:?}", period);

        Self { shared }
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Replace the grid and reconcile widgets against it
    pub fn set_buttons(&self, grid: Vec<Vec<T>>) {
        self.shared.set_buttons(grid);
    }

    /// The grid as last set
    pub fn buttons(&self) -> Vec<Vec<T>> {
        self.shared.state.borrow().grid.clone()
    }

    /// Taps on any button, as `(button, item)`
    pub fn selection(&self) -> EventStream<(Button, T)> {
        self.shared.state.borrow().multiplexer.selection().clone()
    }

    /// Long presses on any button, as `(button, item)`
    pub fn long_press(&self) -> EventStream<(Button, T)> {
        self.shared.state.borrow().multiplexer.long_press().clone()
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Set the container width; lays out again when it changes
    pub fn set_width(&self, width: f32) {
        {
            let mut state = self.shared.state.borrow_mut();
            if state.width == width {
                return;
            }
            state.width = width;
        }
        self.shared.layout();
    }

    pub fn width(&self) -> f32 {
        self.shared.state.borrow().width
    }

    pub fn set_needs_layout(&self) {
        self.shared.state.borrow_mut().needs_layout = true;
    }

    pub fn needs_layout(&self) -> bool {
        self.shared.state.borrow().needs_layout
    }

    /// Lay out only if something invalidated the last pass
    pub fn layout_if_needed(&self) {
        if self.needs_layout() {
            self.shared.layout();
        }
    }

    /// Configure, measure, and place every button now
    pub fn layout(&self) {
        self.shared.layout();
    }

    /// Route frame changes through `transition` from now on
    pub fn set_transition(&self, transition: impl LayoutTransition<WidgetId> + 'static) {
        self.shared.state.borrow_mut().transition = Box::new(transition);
    }

    /// Measure titles with `measurer` instead of the global one
    ///
    /// Clears the size cache, since cached sizes came from the old measurer.
    pub fn set_measurer(&self, measurer: Arc<dyn TextMeasurer>) {
        let mut state = self.shared.state.borrow_mut();
        state.measurer = measurer;
        state.sizes.clear();
        state.needs_layout = true;
    }

    // =========================================================================
    // Refresh and teardown
    // =========================================================================

    /// Run the configuration function over every live button
    ///
    /// This is what each refresh tick does. The pool is left untouched; a
    /// title that no longer matches its cached size schedules a layout.
    pub fn configure_buttons(&self) {
        self.shared.configure_buttons();
    }

    /// Stop the timer, drop all subscriptions, and detach every button
    ///
    /// Also runs on drop. The grid stays usable as an empty shell: later
    /// `set_buttons` calls are ignored.
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.state.borrow().torn_down
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn config(&self) -> GridConfig {
        self.shared.state.borrow().config.clone()
    }

    /// The button currently showing `item` (or an item equal to it)
    pub fn button_for(&self, item: &T) -> Option<Button> {
        self.shared
            .state
            .borrow()
            .pool
            .get(item)
            .map(|entry| entry.button.clone())
    }

    /// The item `button` currently shows
    pub fn item_for(&self, button: &Button) -> Option<T> {
        self.shared.item_for(button.id())
    }

    /// Number of attached buttons
    pub fn widget_count(&self) -> usize {
        self.shared.state.borrow().tree.len()
    }

    /// Attached buttons in attachment order
    pub fn subviews(&self) -> Vec<Button> {
        self.shared.state.borrow().tree.iter().cloned().collect()
    }

    /// The button and item under `point`, if any
    pub fn hit_test(&self, point: Point) -> Option<(Button, T)> {
        let button = self.shared.state.borrow().tree.hit_test(point)?;
        let item = self.shared.item_for(button.id())?;
        Some((button, item))
    }

    /// Lines from the last layout pass
    pub fn lines(&self) -> Vec<Line<T>> {
        self.shared.state.borrow().lines.clone()
    }

    /// Bottom edge of the lowest button after the last layout pass
    pub fn content_height(&self) -> f32 {
        self.shared.state.borrow().content_height
    }

    pub fn size_cache_len(&self) -> usize {
        self.shared.state.borrow().sizes.len()
    }

    pub fn size_cache_stats(&self) -> SizeCacheStats {
        self.shared.state.borrow().sizes.stats()
    }

    /// Refresh ticks that ran the configuration function
    pub fn tick_count(&self) -> u64 {
        self.shared.ticks.get()
    }

    /// Refresh ticks skipped because the grid was busy
    pub fn deferred_ticks(&self) -> u64 {
        self.shared.deferred_ticks.get()
    }
}

impl<T: GridItem> Drop for ButtonGridView<T> {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl<T: GridItem> fmt::Debug for ButtonGridView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("ButtonGridView")
            .field("widgets", &state.tree.len())
            .field("lines", &state.lines.len())
            .field("width", &state.width)
            .field("torn_down", &state.torn_down)
            .finish()
    }
}

impl<T: GridItem> GridShared<T> {
    fn lookup(self: &Rc<Self>) -> ItemLookup<T> {
        let weak = Rc::downgrade(self);
        Rc::new(move |id: WidgetId| weak.upgrade()?.item_for(id))
    }

    fn item_for(&self, id: WidgetId) -> Option<T> {
        let Ok(state) = self.state.try_borrow() else {
            tracing::debug!("ButtonGridView: item lookup for {:?} while busy, event dropped", id);
            return None;
        };
        state.index.get(&id).cloned()
    }

    fn set_buttons(self: &Rc<Self>, grid: Vec<Vec<T>>) {
        if self.busy.get() {
            tracing::trace!("ButtonGridView: grid set while busy, queued");
            *self.pending_grid.borrow_mut() = Some(grid);
            return;
        }
        if self.pending_grid.borrow_mut().take().is_some() {
            tracing::trace!("ButtonGridView: queued grid superseded");
        }

        {
            let _busy = BusyGuard::enter(&self.busy);
            let lookup = self.lookup();
            {
                let mut guard = self.state.borrow_mut();
                let state = &mut *guard;
                if state.torn_down {
                    tracing::warn!("ButtonGridView: set_buttons after teardown ignored");
                    return;
                }

                let old = mem::take(&mut state.pool);
                let mut factory = GridFactory {
                    config: &state.config,
                    tree: &mut state.tree,
                    sizes: &mut state.sizes,
                    multiplexer: &state.multiplexer,
                    lookup: &lookup,
                };
                let result = reconcile(old, &grid, &mut factory);

                state.pool = result.pool;
                state.index = state
                    .pool
                    .iter()
                    .map(|(item, entry)| (entry.button.id(), item.clone()))
                    .collect();
                state.grid = grid;
                state.multiplexer.rebuild(&state.pool, lookup);
            }
            self.run_layout();
        }

        self.apply_pending();
    }

    /// Apply a grid queued during a busy section, once the outermost one ends
    fn apply_pending(self: &Rc<Self>) {
        if self.busy.get() {
            return;
        }
        let pending = self.pending_grid.borrow_mut().take();
        if let Some(grid) = pending {
            tracing::trace!("ButtonGridView: applying queued grid");
            self.set_buttons(grid);
        }
    }

    /// One entry per live widget, in grid order, first occurrence wins
    fn ordered_sections(state: &GridState<T>) -> Vec<Vec<(T, Button)>> {
        let mut seen = FxHashSet::default();
        state
            .grid
            .iter()
            .map(|section| {
                section
                    .iter()
                    .filter_map(|item| {
                        let (key, entry) = state.pool.get_key_value(item)?;
                        seen.insert(entry.button.id())
                            .then(|| (key.clone(), entry.button.clone()))
                    })
                    .collect()
            })
            .collect()
    }

    fn layout(self: &Rc<Self>) {
        self.run_layout();
        self.apply_pending();
    }

    fn run_layout(&self) {
        let _busy = BusyGuard::enter(&self.busy);

        let (sections, width) = {
            let state = self.state.borrow();
            if state.torn_down {
                return;
            }
            (Self::ordered_sections(&state), state.width)
        };

        for (item, button) in sections.iter().flatten() {
            (self.configure)(button, item);
        }

        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let measurer = Arc::clone(&state.measurer);
        let sizes = &mut state.sizes;
        let items: Vec<Vec<FlowItem>> = sections
            .iter()
            .map(|section| {
                section
                    .iter()
                    .map(|(item, button)| {
                        let title = button.title();
                        let size = sizes.measure(button.id(), title.as_deref(), || {
                            button.fit_size(&*measurer)
                        });
                        FlowItem::new(size, item.keep_small())
                    })
                    .collect()
            })
            .collect();

        let result = state.layout.compute(items, width);
        let placed: Vec<(T, Button)> = sections.into_iter().flatten().collect();

        state.transition.begin();
        for ((_, button), frame) in placed.iter().zip(&result.frames) {
            let from = button.frame();
            if from != *frame {
                state.transition.frame_changed(FrameChange {
                    key: button.id(),
                    from,
                    to: *frame,
                });
                button.set_frame(*frame);
            }
        }
        state.transition.commit();

        for (_, button) in &placed {
            button.mark_needs_display();
        }

        state.lines = result
            .lines
            .iter()
            .map(|line| line.items.iter().map(|&i| placed[i].clone()).collect())
            .collect();
        state.content_height = result.content_height;
        state.needs_layout = false;

        tracing::trace!(
            "ButtonGridView: laid out {} buttons in {} lines",
            placed.len(),
            state.lines.len()
        );
    }

    fn configure_buttons(self: &Rc<Self>) {
        self.run_configure();
        self.apply_pending();
    }

    fn run_configure(&self) {
        let _busy = BusyGuard::enter(&self.busy);

        let targets: Vec<(T, Button)> = {
            let state = self.state.borrow();
            if state.torn_down {
                return;
            }
            state
                .pool
                .iter()
                .map(|(item, entry)| (item.clone(), entry.button.clone()))
                .collect()
        };

        for (item, button) in &targets {
            (self.configure)(button, item);
        }

        let mut state = self.state.borrow_mut();
        let stale = targets.iter().any(|(_, button)| match state.sizes.get(button.id()) {
            Some(entry) => !button.title_matches(entry.text.as_deref()),
            None => true,
        });
        if stale {
            state.needs_layout = true;
        }
    }

    fn tick(self: &Rc<Self>) {
        if self.busy.get() {
            let deferred = self.deferred_ticks.get() + 1;
            self.deferred_ticks.set(deferred);
            tracing::trace!("ButtonGridView: refresh tick deferred ({} so far)", deferred);
            return;
        }
        self.ticks.set(self.ticks.get() + 1);
        self.configure_buttons();
    }

    fn teardown(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.torn_down {
            return;
        }
        state.torn_down = true;

        if let Some(timer) = state.timer.take() {
            state.scheduler.cancel(timer);
        }
        state.multiplexer.clear();
        let pool = mem::take(&mut state.pool);
        let widgets = pool.len();
        drop(pool);
        state.index.clear();
        state.tree.clear();
        state.sizes.clear();
        state.lines.clear();
        state.grid.clear();
        self.pending_grid.borrow_mut().take();

        tracing::debug!("ButtonGridView: torn down, {} widgets released", widgets);
    }
}
