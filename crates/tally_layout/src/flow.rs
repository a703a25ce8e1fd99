//! Wrapped flow layout with flexible width growth
//!
//! Lays out a sequence of sections, each a sequence of pre-measured items,
//! into rows ("lines") that fit the container width.
//!
//! # Algorithm
//!
//! **Pass 1, flow assignment.** The very first item sits at
//! `(margin, top_inset)`. Every following item is tentatively placed one
//! `gap` to the right of its predecessor. It starts a new line instead when it
//! is the first item of a new section, or when its right edge would pass
//! `container_width - margin`. A new line resets `x` to `margin` and moves `y`
//! down by the predecessor's height plus `section_gap` (new section) or
//! `line_gap` (plain wrap).
//!
//! **Pass 2, width redistribution.** For each line,
//! `slack = (container_width - 2 * margin) - (sum of widths + (n - 1) * gap)`.
//! When slack is positive and at least one item is growable (not
//! `keep_small`), every growable item widens by `slack / growable` and the
//! items after it are re-anchored one `gap` to the right of their
//! predecessor. Lines with no slack or no growable items are left alone.
//!
//! ```text
//!  margin                               margin
//!  |<->|[ Coffee ]<gap>[ Tea ]<gap>[ + ]|<->|     before
//!  |<->|[  Coffee   ]<gap>[  Tea   ]<gap>[ + ]|<->|  after (`+` keeps small)
//! ```

use smallvec::SmallVec;
use tally_core::{Point, Rect, Size};

/// Spacing constants for the flow layout
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowConfig {
    /// Left and right inset of every line
    pub margin: f32,
    /// Horizontal space between neighbours on a line
    pub gap: f32,
    /// Vertical space added when a line wraps within a section
    pub line_gap: f32,
    /// Vertical space added before a new section
    pub section_gap: f32,
    /// `y` of the first line
    pub top_inset: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            margin: 10.0,
            gap: 10.0,
            line_gap: 10.0,
            section_gap: 20.0,
            top_inset: 20.0,
        }
    }
}

/// One pre-measured item to place
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowItem {
    pub size: Size,
    /// Exempt from width growth
    pub keep_small: bool,
}

impl FlowItem {
    pub fn new(size: Size, keep_small: bool) -> Self {
        Self { size, keep_small }
    }
}

/// One visual row, recomputed on every pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowLine {
    /// Indices into [`FlowResult::frames`], left to right
    pub items: SmallVec<[usize; 8]>,
    /// Section the line belongs to
    pub section: usize,
    /// Leftover width before redistribution (may be negative)
    pub slack: f32,
    /// Width added to each growable item (0 when unchanged)
    pub growth: f32,
}

/// Output of a layout pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowResult {
    /// Final frame of every item, in flattened input order
    pub frames: Vec<Rect>,
    pub lines: Vec<FlowLine>,
    /// Bottom edge of the lowest item (0 when empty)
    pub content_height: f32,
}

impl FlowResult {
    /// Line index containing the item at `index`
    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.lines.iter().position(|l| l.items.contains(&index))
    }
}

/// The flow layout engine
#[derive(Clone, Copy, Debug, Default)]
pub struct FlowLayout {
    config: FlowConfig,
}

impl FlowLayout {
    pub fn new(config: FlowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Available line width inside the margins
    pub fn available_width(&self, container_width: f32) -> f32 {
        container_width - 2.0 * self.config.margin
    }

    /// Run both passes over `sections` for a container `container_width` wide
    pub fn compute<S, I>(&self, sections: S, container_width: f32) -> FlowResult
    where
        S: IntoIterator<Item = I>,
        I: IntoIterator<Item = FlowItem>,
    {
        let cfg = &self.config;
        if container_width <= 0.0 {
            tracing::warn!(
                "FlowLayout: non-positive container width {}, output will be degenerate",
                container_width
            );
        }

        let mut frames: Vec<Rect> = Vec::new();
        let mut keep_small: Vec<bool> = Vec::new();
        let mut lines: Vec<FlowLine> = vec![FlowLine::default()];
        let right_limit = container_width - cfg.margin;

        // Pass 1: flow assignment
        for (section_index, section) in sections.into_iter().enumerate() {
            let mut is_new_section = true;
            for item in section {
                let index = frames.len();
                let frame = match frames.last() {
                    None => {
                        lines[0].section = section_index;
                        Rect::from_origin_size(Point::new(cfg.margin, cfg.top_inset), item.size)
                    }
                    Some(last) => {
                        let tentative = Rect::from_origin_size(
                            Point::new(last.max_x() + cfg.gap, last.y()),
                            item.size,
                        );
                        if is_new_section || tentative.max_x() > right_limit {
                            let vertical_gap = if is_new_section {
                                cfg.section_gap
                            } else {
                                cfg.line_gap
                            };
                            lines.push(FlowLine {
                                section: section_index,
                                ..FlowLine::default()
                            });
                            Rect::from_origin_size(
                                Point::new(cfg.margin, last.max_y() + vertical_gap),
                                item.size,
                            )
                        } else {
                            tentative
                        }
                    }
                };

                if let Some(line) = lines.last_mut() {
                    line.items.push(index);
                }
                frames.push(frame);
                keep_small.push(item.keep_small);
                is_new_section = false;
            }
        }

        if frames.is_empty() {
            lines.clear();
        }

        // Pass 2: width redistribution
        let available = self.available_width(container_width);
        for line in &mut lines {
            self.grow_line(line, &mut frames, &keep_small, available);
        }

        let content_height = frames.iter().map(Rect::max_y).fold(0.0, f32::max);
        tracing::trace!(
            "FlowLayout: {} items in {} lines, content height {}",
            frames.len(),
            lines.len(),
            content_height
        );

        FlowResult {
            frames,
            lines,
            content_height,
        }
    }

    fn grow_line(&self, line: &mut FlowLine, frames: &mut [Rect], keep_small: &[bool], available: f32) {
        let gap = self.config.gap;
        let count = line.items.len();
        if count == 0 {
            return;
        }

        let used: f32 = line.items.iter().map(|&i| frames[i].width()).sum::<f32>()
            + (count - 1) as f32 * gap;
        line.slack = available - used;
        if line.slack <= 0.0 {
            return;
        }

        let growable = line.items.iter().filter(|&&i| !keep_small[i]).count();
        if growable == 0 {
            return;
        }

        let growth = line.slack / growable as f32;
        line.growth = growth;

        let mut previous: Option<Rect> = None;
        for &i in &line.items {
            if !keep_small[i] {
                frames[i].size.width += growth;
            }
            if let Some(prev) = previous {
                frames[i].origin.x = prev.max_x() + gap;
            }
            previous = Some(frames[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn item(width: f32) -> FlowItem {
        FlowItem::new(Size::new(width, 30.0), false)
    }

    fn small(width: f32) -> FlowItem {
        FlowItem::new(Size::new(width, 30.0), true)
    }

    fn line_extent(result: &FlowResult, line: usize) -> f32 {
        let items = &result.lines[line].items;
        let first = result.frames[items[0]];
        let last = result.frames[*items.last().unwrap()];
        last.max_x() - first.x()
    }

    #[test]
    fn test_empty_input() {
        let result = FlowLayout::default().compute(Vec::<Vec<FlowItem>>::new(), 320.0);
        assert!(result.frames.is_empty());
        assert!(result.lines.is_empty());
        assert_eq!(result.content_height, 0.0);
    }

    #[test]
    fn test_first_item_at_margin_and_top_inset() {
        let result = FlowLayout::default().compute(vec![vec![small(60.0)]], 320.0);
        assert_eq!(result.frames[0], Rect::new(10.0, 20.0, 60.0, 30.0));
    }

    #[test]
    fn test_wrapping_three_items() {
        // 100 + 10 + 100 = 210 fits before 240; the third would end at 340
        let layout = FlowLayout::default();
        let result = layout.compute(vec![vec![small(100.0), small(100.0), small(120.0)]], 250.0);

        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[0].items.as_slice(), &[0, 1]);
        assert_eq!(result.lines[1].items.as_slice(), &[2]);

        let third = result.frames[2];
        assert_eq!(third.x(), 10.0);
        // first line height (30) + wrap gap (10) below the first line's top (20)
        assert_eq!(third.y(), 20.0 + 30.0 + 10.0);
    }

    #[test]
    fn test_section_break_always_wraps() {
        let layout = FlowLayout::default();
        let result = layout.compute(vec![vec![small(60.0)], vec![small(60.0)]], 10_000.0);

        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[1].section, 1);
        assert_eq!(result.frames[1].x(), 10.0);
        assert_eq!(result.frames[1].y(), 20.0 + 30.0 + 20.0);
    }

    #[test]
    fn test_empty_section_between_items_still_breaks() {
        let layout = FlowLayout::default();
        let result = layout.compute(vec![vec![small(60.0)], vec![], vec![small(60.0)]], 10_000.0);
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[1].section, 2);
    }

    #[test]
    fn test_line_fill_exact() {
        let layout = FlowLayout::default();
        let result = layout.compute(vec![vec![item(60.0), item(70.0), small(60.0)]], 320.0);

        assert_eq!(result.lines.len(), 1);
        let available = layout.available_width(320.0);
        assert!((line_extent(&result, 0) - available).abs() < EPS);

        // slack = 300 - (190 + 20) = 90, split over two growable items
        assert!((result.lines[0].growth - 45.0).abs() < EPS);
        assert!((result.frames[0].width() - 105.0).abs() < EPS);
        assert!((result.frames[1].x() - (10.0 + 105.0 + 10.0)).abs() < EPS);
    }

    #[test]
    fn test_keep_small_never_grows() {
        let layout = FlowLayout::default();
        for width in [200.0, 320.0, 1000.0] {
            let result = layout.compute(vec![vec![small(60.0), item(60.0), small(80.0)]], width);
            for line in &result.lines {
                for &i in &line.items {
                    if i != 1 {
                        let expected = if i == 0 { 60.0 } else { 80.0 };
                        assert_eq!(result.frames[i].width(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_all_keep_small_line_unchanged() {
        let layout = FlowLayout::default();
        let result = layout.compute(vec![vec![small(60.0), small(60.0)]], 320.0);
        assert_eq!(result.lines[0].growth, 0.0);
        assert!(result.lines[0].slack > 0.0);
        assert_eq!(result.frames[1], Rect::new(80.0, 20.0, 60.0, 30.0));
    }

    #[test]
    fn test_overfull_line_left_alone() {
        // A single item wider than the container keeps its measured width
        let layout = FlowLayout::default();
        let result = layout.compute(vec![vec![item(400.0)]], 320.0);
        assert!(result.lines[0].slack < 0.0);
        assert_eq!(result.frames[0].width(), 400.0);
    }

    #[test]
    fn test_lines_never_exceed_available_width() {
        let layout = FlowLayout::default();
        let widths = [60.0, 95.0, 140.0, 60.0, 75.0, 110.0, 60.0, 200.0];
        let section: Vec<FlowItem> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| FlowItem::new(Size::new(w, 30.0), i % 3 == 0))
            .collect();

        let result = layout.compute(vec![section], 300.0);
        for (n, line) in result.lines.iter().enumerate() {
            if line.items.len() > 1 || result.frames[line.items[0]].width() <= 280.0 {
                assert!(line_extent(&result, n) <= layout.available_width(300.0) + EPS);
            }
        }
    }

    #[test]
    fn test_zero_width_container_is_degenerate_not_fatal() {
        let result = FlowLayout::default().compute(vec![vec![item(60.0), item(60.0)]], 0.0);
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.frames[0].width(), 60.0);
    }

    #[test]
    fn test_content_height() {
        let result = FlowLayout::default().compute(vec![vec![small(60.0)], vec![small(60.0)]], 320.0);
        assert_eq!(result.content_height, 20.0 + 30.0 + 20.0 + 30.0);
        assert_eq!(result.line_of(1), Some(1));
    }
}
