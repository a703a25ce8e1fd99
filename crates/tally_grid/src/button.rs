//! Grid button widget
//!
//! A [`Button`] is a cheap, clonable handle to one on-screen button. Clones
//! share state, so the grid, its pool, and any subscriber closures all see
//! the same title, frame, and highlight.
//!
//! Buttons expose two event streams:
//!
//! - `taps()`: a press released before the long-press threshold
//! - `long_presses()`: a press held past the threshold (once per press)
//!
//! Input is driven by the host through `press_down` / `poll_press` /
//! `press_up`, or by `tap()` for synthetic activation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tally_core::{Color, EdgeInsets, EventStream, Rect, Size};
use tally_layout::TextMeasurer;

use crate::gesture::{LongPressRecognizer, PressOutcome};
use crate::tree::WidgetId;

/// Default title font size
pub const DEFAULT_FONT_SIZE: f32 = 17.0;

/// Mutable presentation state
#[derive(Clone, Debug)]
struct ButtonState {
    title: Option<String>,
    frame: Rect,
    content_insets: EdgeInsets,
    font_size: f32,
    background: Option<Color>,
    highlighted: bool,
    attached: bool,
}

impl Default for ButtonState {
    fn default() -> Self {
        Self {
            title: None,
            frame: Rect::ZERO,
            content_insets: EdgeInsets::ZERO,
            font_size: DEFAULT_FONT_SIZE,
            background: None,
            highlighted: false,
            attached: false,
        }
    }
}

struct ButtonInner {
    id: WidgetId,
    state: RefCell<ButtonState>,
    display_generation: Cell<u64>,
    taps: EventStream<()>,
    long_presses: EventStream<()>,
    recognizer: RefCell<Option<LongPressRecognizer>>,
}

/// Shared handle to a grid button
#[derive(Clone)]
pub struct Button {
    inner: Rc<ButtonInner>,
}

impl Button {
    /// Create a detached button with the given identity
    pub fn new(id: WidgetId) -> Self {
        Self {
            inner: Rc::new(ButtonInner {
                id,
                state: RefCell::new(ButtonState::default()),
                display_generation: Cell::new(0),
                taps: EventStream::new(),
                long_presses: EventStream::new(),
                recognizer: RefCell::new(None),
            }),
        }
    }

    pub fn id(&self) -> WidgetId {
        self.inner.id
    }

    /// Whether two handles refer to the same button
    pub fn ptr_eq(&self, other: &Button) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakButton {
        WeakButton {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // =========================================================================
    // Presentation
    // =========================================================================

    pub fn title(&self) -> Option<String> {
        self.inner.state.borrow().title.clone()
    }

    pub fn set_title(&self, title: Option<impl Into<String>>) {
        self.inner.state.borrow_mut().title = title.map(Into::into);
    }

    /// Compare the current title without cloning it
    pub fn title_matches(&self, text: Option<&str>) -> bool {
        self.inner.state.borrow().title.as_deref() == text
    }

    pub fn frame(&self) -> Rect {
        self.inner.state.borrow().frame
    }

    pub fn set_frame(&self, frame: Rect) {
        self.inner.state.borrow_mut().frame = frame;
    }

    pub fn content_insets(&self) -> EdgeInsets {
        self.inner.state.borrow().content_insets
    }

    pub fn set_content_insets(&self, insets: EdgeInsets) {
        self.inner.state.borrow_mut().content_insets = insets;
    }

    pub fn font_size(&self) -> f32 {
        self.inner.state.borrow().font_size
    }

    pub fn set_font_size(&self, size: f32) {
        self.inner.state.borrow_mut().font_size = size;
    }

    pub fn background(&self) -> Option<Color> {
        self.inner.state.borrow().background
    }

    pub fn set_background(&self, color: Option<Color>) {
        self.inner.state.borrow_mut().background = color;
    }

    /// Background as drawn: darkened while highlighted
    pub fn display_background(&self) -> Option<Color> {
        let state = self.inner.state.borrow();
        state
            .background
            .map(|c| if state.highlighted { c.darken(0.2) } else { c })
    }

    pub fn is_highlighted(&self) -> bool {
        self.inner.state.borrow().highlighted
    }

    pub fn set_highlighted(&self, highlighted: bool) {
        self.inner.state.borrow_mut().highlighted = highlighted;
    }

    pub fn is_attached(&self) -> bool {
        self.inner.state.borrow().attached
    }

    pub(crate) fn set_attached(&self, attached: bool) {
        let mut state = self.inner.state.borrow_mut();
        state.attached = attached;
        if !attached {
            state.highlighted = false;
        }
        drop(state);
        if !attached {
            if let Some(recognizer) = self.inner.recognizer.borrow_mut().as_mut() {
                recognizer.cancel();
            }
        }
    }

    /// Ask the renderer to redraw this button on the next frame
    pub fn mark_needs_display(&self) {
        let generation = self.inner.display_generation.get();
        self.inner.display_generation.set(generation + 1);
    }

    /// Bumped by every `mark_needs_display`
    pub fn display_generation(&self) -> u64 {
        self.inner.display_generation.get()
    }

    // =========================================================================
    // Sizing
    // =========================================================================

    /// Natural size: title metrics grown by the content insets
    ///
    /// A button without a title measures as an empty string, so it still
    /// gets the line height plus insets.
    pub fn fit_size(&self, measurer: &dyn TextMeasurer) -> Size {
        let state = self.inner.state.borrow();
        let text = state.title.as_deref().unwrap_or("");
        let metrics = measurer.measure(text, state.font_size);
        Size::new(metrics.width, metrics.height).outset(state.content_insets)
    }

    /// Resize to the natural size, keeping the origin
    pub fn size_to_fit(&self, measurer: &dyn TextMeasurer) -> Size {
        let size = self.fit_size(measurer);
        self.inner.state.borrow_mut().frame.size = size;
        size
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn taps(&self) -> &EventStream<()> {
        &self.inner.taps
    }

    pub fn long_presses(&self) -> &EventStream<()> {
        &self.inner.long_presses
    }

    /// Install a long-press recognizer; a button holds at most one
    ///
    /// Returns `false` when one is already installed.
    pub fn add_long_press_recognizer(&self, min_duration: Duration) -> bool {
        let mut slot = self.inner.recognizer.borrow_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(LongPressRecognizer::new(min_duration));
        true
    }

    pub fn has_long_press_recognizer(&self) -> bool {
        self.inner.recognizer.borrow().is_some()
    }

    /// Emit a tap immediately
    pub fn tap(&self) {
        self.inner.taps.emit(());
    }

    /// Finger (or pointer) down
    pub fn press_down(&self, at: Instant) {
        self.set_highlighted(true);
        if let Some(recognizer) = self.inner.recognizer.borrow_mut().as_mut() {
            recognizer.press_down(at);
        }
    }

    /// Advance the held press; emits a long press when the threshold is crossed
    pub fn poll_press(&self, now: Instant) -> bool {
        let began = self
            .inner
            .recognizer
            .borrow_mut()
            .as_mut()
            .is_some_and(|r| r.poll(now));
        if began {
            self.inner.long_presses.emit(());
        }
        began
    }

    /// Finger (or pointer) up; emits a tap unless the press became a long press
    pub fn press_up(&self, at: Instant) -> PressOutcome {
        self.poll_press(at);
        let was_pressed = self.is_highlighted();
        self.set_highlighted(false);

        let outcome = match self.inner.recognizer.borrow_mut().as_mut() {
            Some(recognizer) => recognizer.press_up(at),
            None if was_pressed => PressOutcome::Tap,
            None => PressOutcome::Ignored,
        };
        if outcome == PressOutcome::Tap {
            self.inner.taps.emit(());
        }
        outcome
    }

    /// Abandon the current press without emitting
    pub fn cancel_press(&self) {
        self.set_highlighted(false);
        if let Some(recognizer) = self.inner.recognizer.borrow_mut().as_mut() {
            recognizer.cancel();
        }
    }
}

impl PartialEq for Button {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Button {}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Button")
            .field("id", &self.inner.id)
            .field("title", &state.title)
            .field("frame", &state.frame)
            .field("attached", &state.attached)
            .finish()
    }
}

/// Non-owning button handle, held by event closures
#[derive(Clone)]
pub struct WeakButton {
    inner: Weak<ButtonInner>,
}

impl WeakButton {
    pub fn upgrade(&self) -> Option<Button> {
        self.inner.upgrade().map(|inner| Button { inner })
    }
}

impl fmt::Debug for WeakButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakButton")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::WidgetTree;
    use tally_layout::EstimatedTextMeasurer;

    const MIN: Duration = Duration::from_millis(230);

    fn button() -> (WidgetTree, Button) {
        let mut tree = WidgetTree::new();
        let b = tree.attach_with(Button::new);
        (tree, b)
    }

    fn counter(stream: &EventStream<()>) -> (Rc<RefCell<u32>>, tally_core::Subscription) {
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let sub = stream.subscribe(move |_| *c.borrow_mut() += 1);
        (count, sub)
    }

    #[test]
    fn test_fit_size_includes_insets() {
        let (_tree, b) = button();
        b.set_title(Some("Go"));
        b.set_font_size(10.0);
        b.set_content_insets(EdgeInsets::uniform(5.0));

        let size = b.fit_size(&EstimatedTextMeasurer);
        // 2 chars * 10 * 0.55 = 11, height 10 * 1.2 = 12
        assert!((size.width - 21.0).abs() < 0.001);
        assert!((size.height - 22.0).abs() < 0.001);
    }

    #[test]
    fn test_untitled_button_has_line_height() {
        let (_tree, b) = button();
        b.set_title(None::<String>);
        let size = b.size_to_fit(&EstimatedTextMeasurer);
        assert_eq!(size.width, 0.0);
        assert!(size.height > 0.0);
        assert_eq!(b.frame().size, size);
    }

    #[test]
    fn test_plain_press_taps() {
        let (_tree, b) = button();
        let (taps, _sub) = counter(b.taps());
        let t0 = Instant::now();

        b.press_down(t0);
        assert!(b.is_highlighted());
        assert_eq!(b.press_up(t0 + Duration::from_secs(3)), PressOutcome::Tap);

        assert_eq!(*taps.borrow(), 1);
        assert!(!b.is_highlighted());
    }

    #[test]
    fn test_long_press_threshold() {
        let (_tree, b) = button();
        assert!(!b.has_long_press_recognizer());
        assert!(b.add_long_press_recognizer(MIN));
        assert!(!b.add_long_press_recognizer(MIN));
        assert!(b.has_long_press_recognizer());

        let (taps, _t) = counter(b.taps());
        let (longs, _l) = counter(b.long_presses());
        let t0 = Instant::now();

        // Short press: a tap, no long press
        b.press_down(t0);
        b.press_up(t0 + Duration::from_millis(100));
        assert_eq!((*taps.borrow(), *longs.borrow()), (1, 0));

        // Held past the threshold: exactly one long press, no tap
        b.press_down(t0);
        b.poll_press(t0 + Duration::from_millis(240));
        b.poll_press(t0 + Duration::from_millis(600));
        b.press_up(t0 + Duration::from_secs(1));
        assert_eq!((*taps.borrow(), *longs.borrow()), (1, 1));
    }

    #[test]
    fn test_release_after_threshold_without_poll() {
        let (_tree, b) = button();
        b.add_long_press_recognizer(MIN);
        let (taps, _t) = counter(b.taps());
        let (longs, _l) = counter(b.long_presses());
        let t0 = Instant::now();

        b.press_down(t0);
        assert_eq!(b.press_up(t0 + MIN), PressOutcome::LongPressEnded);
        assert_eq!((*taps.borrow(), *longs.borrow()), (0, 1));
    }

    #[test]
    fn test_cancel_press_emits_nothing() {
        let (_tree, b) = button();
        b.add_long_press_recognizer(MIN);
        let (taps, _t) = counter(b.taps());
        let (longs, _l) = counter(b.long_presses());
        let t0 = Instant::now();

        b.press_down(t0);
        b.cancel_press();
        assert!(!b.is_highlighted());
        assert!(!b.poll_press(t0 + Duration::from_secs(1)));
        assert_eq!(b.press_up(t0 + Duration::from_secs(2)), PressOutcome::Ignored);
        assert_eq!((*taps.borrow(), *longs.borrow()), (0, 0));

        // The next press starts fresh
        b.press_down(t0 + Duration::from_secs(3));
        assert_eq!(b.press_up(t0 + Duration::from_millis(3100)), PressOutcome::Tap);
        assert_eq!(*taps.borrow(), 1);
    }

    #[test]
    fn test_detach_cancels_press() {
        let (mut tree, b) = button();
        b.add_long_press_recognizer(MIN);
        let (longs, _l) = counter(b.long_presses());
        let t0 = Instant::now();

        b.press_down(t0);
        tree.detach(b.id());
        assert!(!b.poll_press(t0 + Duration::from_secs(1)));
        assert_eq!(*longs.borrow(), 0);
        assert!(!b.is_highlighted());
    }

    #[test]
    fn test_display_background_darkens() {
        let (_tree, b) = button();
        b.set_background(Some(Color::WHITE));
        assert_eq!(b.display_background(), Some(Color::WHITE));
        b.set_highlighted(true);
        assert_ne!(b.display_background(), Some(Color::WHITE));
    }

    #[test]
    fn test_weak_handle() {
        let (mut tree, b) = button();
        let weak = b.downgrade();
        assert!(weak.upgrade().is_some_and(|u| u == b));

        tree.detach(b.id());
        drop(b);
        assert!(weak.upgrade().is_none());
    }
}
