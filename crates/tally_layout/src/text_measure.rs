//! Text measurement for layout
//!
//! Provides a trait for measuring label dimensions during layout, a cheap
//! estimating fallback, and a process-wide measurer slot that the platform
//! layer fills in at startup with a real (shaping) implementation.

use std::sync::{Arc, RwLock};

/// Text layout options that affect measurement
#[derive(Debug, Clone)]
pub struct TextLayoutOptions {
    /// Line height multiplier (1.0 = default, 1.5 = 150%)
    pub line_height: f32,
    /// Extra spacing between letters in pixels
    pub letter_spacing: f32,
    /// Maximum width for wrapping (None = no wrapping)
    pub max_width: Option<f32>,
}

impl Default for TextLayoutOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutOptions {
    /// Create default options
    pub fn new() -> Self {
        Self {
            line_height: 1.2,
            letter_spacing: 0.0,
            max_width: None,
        }
    }

    /// Set line height multiplier
    pub fn with_line_height(mut self, height: f32) -> Self {
        self.line_height = height;
        self
    }

    /// Set letter spacing
    pub fn with_letter_spacing(mut self, spacing: f32) -> Self {
        self.letter_spacing = spacing;
        self
    }

    /// Set max width for wrapping
    pub fn with_max_width(mut self, width: f32) -> Self {
        self.max_width = Some(width);
        self
    }
}

/// Text measurement result
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextMetrics {
    /// Width in pixels
    pub width: f32,
    /// Height in pixels (accounts for line height and number of lines)
    pub height: f32,
    /// Number of lines (1 for single-line text)
    pub line_count: u32,
}

/// Trait for measuring text dimensions
///
/// Measurement is assumed to be expensive (font shaping); callers are
/// expected to cache results, see [`SizeCache`](crate::size_cache::SizeCache).
pub trait TextMeasurer: Send + Sync {
    /// Measure the dimensions of a text string with full layout options
    fn measure_with_options(
        &self,
        text: &str,
        font_size: f32,
        options: &TextLayoutOptions,
    ) -> TextMetrics;

    /// Measure text with default options (convenience method)
    fn measure(&self, text: &str, font_size: f32) -> TextMetrics {
        self.measure_with_options(text, font_size, &TextLayoutOptions::new())
    }
}

/// A text measurer that uses estimates
///
/// Used when no real text measurer is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedTextMeasurer;

impl TextMeasurer for EstimatedTextMeasurer {
    fn measure_with_options(
        &self,
        text: &str,
        font_size: f32,
        options: &TextLayoutOptions,
    ) -> TextMetrics {
        let char_count = text.chars().count() as f32;

        // ~0.55 * font_size per character (conservative for proportional fonts)
        let base_width = char_count * font_size * 0.55;
        let letter_spacing_total = if char_count > 1.0 {
            (char_count - 1.0) * options.letter_spacing
        } else {
            0.0
        };
        let total_width = base_width + letter_spacing_total;

        let (width, line_count) = match options.max_width {
            Some(max_width) if total_width > max_width && max_width > 0.0 => {
                let lines = (total_width / max_width).ceil() as u32;
                (max_width, lines.max(1))
            }
            _ => (total_width, 1),
        };

        TextMetrics {
            width,
            height: font_size * options.line_height * line_count as f32,
            line_count,
        }
    }
}

/// Measurer that forwards to whatever is installed globally
///
/// Resolved on every call, so installing a measurer after widgets were
/// created still takes effect on their next (uncached) measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalTextMeasurer;

impl TextMeasurer for GlobalTextMeasurer {
    fn measure_with_options(
        &self,
        text: &str,
        font_size: f32,
        options: &TextLayoutOptions,
    ) -> TextMetrics {
        measure_text_with_options(text, font_size, options)
    }
}

static TEXT_MEASURER: RwLock<Option<Arc<dyn TextMeasurer>>> = RwLock::new(None);

/// Set the global text measurer
///
/// Call this at app initialization with a real text measurer
/// (e.g., one backed by the font rendering system).
pub fn set_text_measurer(measurer: Arc<dyn TextMeasurer>) {
    let mut guard = TEXT_MEASURER.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(measurer);
}

/// Clear the global text measurer
pub fn clear_text_measurer() {
    let mut guard = TEXT_MEASURER.write().unwrap_or_else(|e| e.into_inner());
    *guard = None;
}

/// Measure text using the global measurer, or fall back to estimation
pub fn measure_text(text: &str, font_size: f32) -> TextMetrics {
    measure_text_with_options(text, font_size, &TextLayoutOptions::new())
}

/// Measure text with options using the global measurer, or fall back to estimation
pub fn measure_text_with_options(
    text: &str,
    font_size: f32,
    options: &TextLayoutOptions,
) -> TextMetrics {
    let guard = TEXT_MEASURER.read().unwrap_or_else(|e| e.into_inner());
    if let Some(ref measurer) = *guard {
        measurer.measure_with_options(text, font_size, options)
    } else {
        EstimatedTextMeasurer.measure_with_options(text, font_size, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_scales_with_length() {
        let short = EstimatedTextMeasurer.measure("ab", 10.0);
        let long = EstimatedTextMeasurer.measure("abcd", 10.0);
        assert!((short.width - 11.0).abs() < 1e-4);
        assert!((long.width - 22.0).abs() < 1e-4);
        assert_eq!(short.line_count, 1);
        assert!((short.height - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_estimate_wraps_at_max_width() {
        let options = TextLayoutOptions::new().with_max_width(20.0);
        let m = EstimatedTextMeasurer.measure_with_options("abcdefgh", 10.0, &options);
        assert_eq!(m.width, 20.0);
        assert_eq!(m.line_count, 3);
    }

    #[test]
    fn test_options_shape_estimate() {
        let options = TextLayoutOptions::new()
            .with_line_height(2.0)
            .with_letter_spacing(1.5);
        let m = EstimatedTextMeasurer.measure_with_options("abc", 10.0, &options);
        // 3 * 5.5 + 2 gaps * 1.5
        assert!((m.width - 19.5).abs() < 1e-4);
        assert!((m.height - 20.0).abs() < 1e-4);
    }

    /// Reports a fixed width so it is easy to tell apart from the estimate
    struct FixedMeasurer;

    impl TextMeasurer for FixedMeasurer {
        fn measure_with_options(
            &self,
            _text: &str,
            font_size: f32,
            options: &TextLayoutOptions,
        ) -> TextMetrics {
            TextMetrics {
                width: 42.0,
                height: font_size * options.line_height,
                line_count: 1,
            }
        }
    }

    #[test]
    fn test_global_measurer_slot() {
        set_text_measurer(Arc::new(FixedMeasurer));
        assert_eq!(measure_text("anything", 10.0).width, 42.0);
        assert_eq!(GlobalTextMeasurer.measure("x", 10.0).width, 42.0);

        clear_text_measurer();
        let fallback = measure_text("ab", 10.0);
        assert_eq!(fallback, EstimatedTextMeasurer.measure("ab", 10.0));
    }

    #[test]
    fn test_empty_text_measures_zero_width() {
        let m = EstimatedTextMeasurer.measure("", 16.0);
        assert_eq!(m.width, 0.0);
    }
}
