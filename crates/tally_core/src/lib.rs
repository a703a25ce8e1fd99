//! Tally Core Runtime
//!
//! Foundational primitives for the Tally UI crates:
//!
//! - **Geometry**: points, sizes, rects, insets, and colors
//! - **Event Streams**: hot multicast streams with RAII subscriptions
//! - **Scheduler**: host-driven recurring timers
//!
//! Everything here is single-threaded. Handles are `Rc`-based and meant to
//! live on the UI thread alongside the widgets that use them.
//!
//! # Example
//!
//! ```rust
//! use tally_core::{EventStream, SubscriptionBag};
//!
//! let taps = EventStream::<&'static str>::new();
//! let mut bag = SubscriptionBag::new();
//! bag.push(taps.subscribe(|name| println!("tapped {name}")));
//!
//! taps.emit("save");
//! bag.clear();
//! assert_eq!(taps.subscriber_count(), 0);
//! ```

pub mod geometry;
pub mod scheduler;
pub mod stream;

pub use geometry::{Color, EdgeInsets, Point, Rect, Size};
pub use scheduler::{Scheduler, TimerCallback, TimerId};
pub use stream::{merge_into, EventStream, SubscriberId, Subscription, SubscriptionBag};
