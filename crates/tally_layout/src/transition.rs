//! Animated layout transitions
//!
//! Layout always settles instantly: frames are written to widgets as soon as
//! a pass finishes. A [`LayoutTransition`] is told which frames moved so the
//! renderer can interpolate the *drawn* bounds from old to new instead of
//! snapping, FLIP style.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tally_core::Rect;
//! use tally_layout::transition::{AnimatedTransition, FrameChange, LayoutTransition};
//!
//! let mut anim = AnimatedTransition::new(Duration::from_millis(200));
//! anim.begin();
//! anim.frame_changed(FrameChange {
//!     key: 1u32,
//!     from: Rect::new(0.0, 0.0, 60.0, 30.0),
//!     to: Rect::new(0.0, 40.0, 60.0, 30.0),
//! });
//! anim.commit();
//!
//! let halfway = anim.sample(1, Duration::from_millis(100)).unwrap();
//! assert!(halfway.y() > 0.0 && halfway.y() < 40.0);
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use smallvec::SmallVec;
use tally_core::Rect;

/// A widget whose frame changed during a layout pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameChange<K> {
    pub key: K,
    pub from: Rect,
    pub to: Rect,
}

/// Receives frame changes, bracketed by `begin`/`commit`
pub trait LayoutTransition<K> {
    /// A layout pass is about to write frames
    fn begin(&mut self) {}

    /// One widget moved or resized
    fn frame_changed(&mut self, change: FrameChange<K>);

    /// The pass finished; start animating what was collected
    fn commit(&mut self) {}
}

/// Snap to new frames without animation
#[derive(Clone, Copy, Debug, Default)]
pub struct Immediate;

impl<K> LayoutTransition<K> for Immediate {
    fn frame_changed(&mut self, _change: FrameChange<K>) {}
}

/// Shared transitions, so a renderer can keep a handle to sample from
impl<K, L: LayoutTransition<K>> LayoutTransition<K> for Rc<RefCell<L>> {
    fn begin(&mut self) {
        self.borrow_mut().begin();
    }

    fn frame_changed(&mut self, change: FrameChange<K>) {
        self.borrow_mut().frame_changed(change);
    }

    fn commit(&mut self) {
        self.borrow_mut().commit();
    }
}

/// Collects the changes of the last committed pass and interpolates them
#[derive(Clone, Debug)]
pub struct AnimatedTransition<K> {
    duration: Duration,
    pending: SmallVec<[FrameChange<K>; 8]>,
    active: SmallVec<[FrameChange<K>; 8]>,
    commits: u64,
}

impl<K: Copy + PartialEq> AnimatedTransition<K> {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            pending: SmallVec::new(),
            active: SmallVec::new(),
            commits: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Changes being animated since the last commit
    pub fn active(&self) -> &[FrameChange<K>] {
        &self.active
    }

    /// Number of committed passes
    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    /// Ease-out progress in `[0, 1]` after `elapsed`
    pub fn progress(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let t = (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0);
        1.0 - (1.0 - t) * (1.0 - t)
    }

    /// Drawn bounds of `key` after `elapsed`, if it is animating
    pub fn sample(&self, key: K, elapsed: Duration) -> Option<Rect> {
        let change = self.active.iter().find(|c| c.key == key)?;
        Some(Rect::lerp(&change.from, &change.to, self.progress(elapsed)))
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        self.active.is_empty() || elapsed >= self.duration
    }
}

impl<K: Copy + PartialEq> LayoutTransition<K> for AnimatedTransition<K> {
    fn begin(&mut self) {
        self.pending.clear();
    }

    fn frame_changed(&mut self, change: FrameChange<K>) {
        self.pending.push(change);
    }

    fn commit(&mut self) {
        self.active = std::mem::take(&mut self.pending);
        self.commits += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_replaces_active_set() {
        let mut anim = AnimatedTransition::new(Duration::from_millis(100));
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);

        anim.begin();
        anim.frame_changed(FrameChange { key: 1u8, from: a, to: b });
        anim.commit();
        assert_eq!(anim.active().len(), 1);

        anim.begin();
        anim.commit();
        assert!(anim.active().is_empty());
        assert_eq!(anim.commit_count(), 2);
    }

    #[test]
    fn test_sample_endpoints() {
        let mut anim = AnimatedTransition::new(Duration::from_millis(100));
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(0.0, 50.0, 30.0, 10.0);
        anim.begin();
        anim.frame_changed(FrameChange { key: 3u8, from: a, to: b });
        anim.commit();

        assert_eq!(anim.sample(3, Duration::ZERO), Some(a));
        assert_eq!(anim.sample(3, Duration::from_millis(500)), Some(b));
        assert_eq!(anim.sample(4, Duration::ZERO), None);
        assert!(anim.is_finished(Duration::from_millis(100)));
    }

    #[test]
    fn test_zero_duration_is_immediate() {
        let anim = AnimatedTransition::<u8>::new(Duration::ZERO);
        assert_eq!(anim.progress(Duration::ZERO), 1.0);
    }
}
