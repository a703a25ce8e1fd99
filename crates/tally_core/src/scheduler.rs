//! Host-driven timer scheduler
//!
//! Components register recurring callbacks here instead of owning threads.
//! The host event loop calls [`Scheduler::advance_to`] with the current time
//! (typically once per loop iteration), and every timer whose deadline has
//! passed fires exactly once for that call. Missed periods are coalesced: a
//! timer that fell three periods behind fires once and is re-armed on the next
//! period boundary after `now`, matching how platform run-loop timers skip
//! rather than burst.
//!
//! Timers stay registered until [`Scheduler::cancel`] is called. A component
//! that owns a timer must cancel it on teardown; otherwise its callback keeps
//! firing against state that no longer exists.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::{Duration, Instant};
//! use tally_core::scheduler::Scheduler;
//!
//! let start = Instant::now();
//! let scheduler = Scheduler::new(start);
//! let ticks = Rc::new(Cell::new(0));
//! let ticks_clone = Rc::clone(&ticks);
//!
//! let timer = scheduler.schedule_repeating(Duration::from_secs(1), move |_| {
//!     ticks_clone.set(ticks_clone.get() + 1);
//! });
//!
//! scheduler.advance_to(start + Duration::from_millis(999));
//! assert_eq!(ticks.get(), 0);
//! scheduler.advance_to(start + Duration::from_secs(1));
//! assert_eq!(ticks.get(), 1);
//!
//! scheduler.cancel(timer);
//! scheduler.advance_to(start + Duration::from_secs(5));
//! assert_eq!(ticks.get(), 1);
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

new_key_type! {
    /// Handle to a registered timer
    pub struct TimerId;
}

/// Callback invoked with the scheduler's current time when a timer fires
pub type TimerCallback = Rc<RefCell<dyn FnMut(Instant)>>;

struct Timer {
    period: Duration,
    next_due: Instant,
    callback: TimerCallback,
    fire_count: u64,
}

struct SchedulerInner {
    timers: SlotMap<TimerId, Timer>,
    now: Instant,
}

/// Single-threaded recurring timer registry (cheap to clone)
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("timers", &inner.timers.len())
            .field("now", &inner.now)
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler whose clock starts at `start`
    pub fn new(start: Instant) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                timers: SlotMap::with_key(),
                now: start,
            })),
        }
    }

    /// The time passed to the most recent `advance_to`
    pub fn now(&self) -> Instant {
        self.inner.borrow().now
    }

    /// Register a callback firing every `period`, first one period from now
    ///
    /// A zero period is clamped to one millisecond so the timer cannot spin.
    pub fn schedule_repeating<F>(&self, period: Duration, callback: F) -> TimerId
    where
        F: FnMut(Instant) + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let mut inner = self.inner.borrow_mut();
        let next_due = inner.now + period;
        let id = inner.timers.insert(Timer {
            period,
            next_due,
            callback: Rc::new(RefCell::new(callback)),
            fire_count: 0,
        });
        tracing::debug!("Scheduler: registered timer {:?} every {:?}", id, period);
        id
    }

    /// Stop a timer; returns false if it was not registered
    pub fn cancel(&self, id: TimerId) -> bool {
        let removed = self.inner.borrow_mut().timers.remove(id).is_some();
        if removed {
            tracing::debug!("Scheduler: cancelled timer {:?}", id);
        }
        removed
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.inner.borrow().timers.contains_key(id)
    }

    pub fn timer_count(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// How many times a timer has fired, if it is still registered
    pub fn fire_count(&self, id: TimerId) -> Option<u64> {
        self.inner.borrow().timers.get(id).map(|t| t.fire_count)
    }

    /// Advance the clock and fire every due timer once
    ///
    /// Returns the number of callbacks invoked. Time never moves backwards;
    /// an earlier `now` is ignored.
    pub fn advance_to(&self, now: Instant) -> usize {
        let due: SmallVec<[(TimerId, TimerCallback); 4]> = {
            let mut inner = self.inner.borrow_mut();
            if now > inner.now {
                inner.now = now;
            }
            let now = inner.now;

            let mut due = SmallVec::new();
            for (id, timer) in inner.timers.iter_mut() {
                if timer.next_due > now {
                    continue;
                }
                while timer.next_due <= now {
                    timer.next_due += timer.period;
                }
                timer.fire_count += 1;
                due.push((id, Rc::clone(&timer.callback)));
            }
            due
        };

        let now = self.now();
        let mut fired = 0;
        for (id, callback) in due {
            // A callback earlier in this batch may have cancelled this timer.
            if !self.is_scheduled(id) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut run) => {
                    (&mut *run)(now);
                    fired += 1;
                }
                Err(_) => tracing::warn!("Scheduler: timer {:?} re-entered, skipping", id),
            }
        }
        fired
    }

    /// Advance the clock by `delta`
    pub fn advance_by(&self, delta: Duration) -> usize {
        let now = self.now() + delta;
        self.advance_to(now)
    }
}
