//! Press gestures
//!
//! A [`LongPressRecognizer`] watches one press at a time and decides whether
//! it becomes a long press (held for at least the minimum duration) or stays
//! a plain tap (released earlier).
//!
//! ```text
//!            press_down
//!   Idle ──────────────▶ Possible ──(held ≥ min)──▶ Began ──press_up──▶ Ended
//!                           │                          │
//!                           │ press_up (< min)         │ cancel
//!                           ▼                          ▼
//!                         Failed  (a tap)          Cancelled
//! ```
//!
//! Only the transition into `Began` is reported as a long press. Holding
//! longer, or polling again while still held, does not report it twice.

use std::time::{Duration, Instant};

/// Recognizer state for the current press
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GestureState {
    /// No press in progress
    #[default]
    Idle,
    /// Pressed, threshold not reached yet
    Possible,
    /// Threshold reached while held
    Began,
    /// Released after beginning
    Ended,
    /// Released before the threshold
    Failed,
    /// Abandoned (e.g. widget detached mid-press)
    Cancelled,
}

/// What releasing a press amounted to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    /// Released before the long-press threshold
    Tap,
    /// Released after the long press began
    LongPressEnded,
    /// There was no press to release
    Ignored,
}

/// Long-press detector with a fixed minimum duration
#[derive(Clone, Debug)]
pub struct LongPressRecognizer {
    min_duration: Duration,
    state: GestureState,
    pressed_at: Option<Instant>,
}

impl LongPressRecognizer {
    pub fn new(min_duration: Duration) -> Self {
        Self {
            min_duration,
            state: GestureState::Idle,
            pressed_at: None,
        }
    }

    pub fn min_duration(&self) -> Duration {
        self.min_duration
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Start tracking a press
    pub fn press_down(&mut self, at: Instant) {
        self.pressed_at = Some(at);
        self.state = GestureState::Possible;
    }

    /// Check the held duration; true exactly when the long press begins now
    pub fn poll(&mut self, now: Instant) -> bool {
        match (self.state, self.pressed_at) {
            (GestureState::Possible, Some(start))
                if now.saturating_duration_since(start) >= self.min_duration =>
            {
                self.state = GestureState::Began;
                true
            }
            _ => false,
        }
    }

    /// Finish the press
    ///
    /// Callers should `poll(at)` first so a long press that crossed the
    /// threshold between polls still begins before it ends.
    pub fn press_up(&mut self, _at: Instant) -> PressOutcome {
        self.pressed_at = None;
        match self.state {
            GestureState::Possible => {
                self.state = GestureState::Failed;
                PressOutcome::Tap
            }
            GestureState::Began => {
                self.state = GestureState::Ended;
                PressOutcome::LongPressEnded
            }
            _ => PressOutcome::Ignored,
        }
    }

    /// Abandon the current press without reporting anything
    pub fn cancel(&mut self) {
        if self.pressed_at.take().is_some() {
            self.state = GestureState::Cancelled;
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }
}
