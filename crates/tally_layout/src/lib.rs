//! Tally Layout Engine
//!
//! Wrapped, sectioned flow layout for rows of buttons, with flexible width
//! redistribution and a text-keyed size cache.
//!
//! # Example
//!
//! ```rust
//! use tally_core::Size;
//! use tally_layout::{FlowItem, FlowLayout};
//!
//! let layout = FlowLayout::default();
//! let result = layout.compute(
//!     vec![
//!         vec![FlowItem::new(Size::new(80.0, 30.0), false)],
//!         vec![FlowItem::new(Size::new(60.0, 30.0), true)],
//!     ],
//!     320.0,
//! );
//!
//! // Sections always start a new line
//! assert_eq!(result.lines.len(), 2);
//! // The growable item fills the line; the keep-small one does not
//! assert_eq!(result.frames[0].width(), 300.0);
//! assert_eq!(result.frames[1].width(), 60.0);
//! ```

pub mod flow;
pub mod size_cache;
pub mod text_measure;
pub mod transition;

pub use flow::{FlowConfig, FlowItem, FlowLayout, FlowLine, FlowResult};
pub use size_cache::{SizeCache, SizeCacheEntry, SizeCacheStats};
pub use text_measure::{
    clear_text_measurer, measure_text, measure_text_with_options, set_text_measurer,
    EstimatedTextMeasurer, GlobalTextMeasurer, TextLayoutOptions, TextMeasurer, TextMetrics,
};
pub use transition::{AnimatedTransition, FrameChange, Immediate, LayoutTransition};
