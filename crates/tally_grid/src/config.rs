//! Button grid configuration
//!
//! Defaults reproduce the stock look: 10pt margins and gaps, 20pt before a
//! new section, 60pt minimum button width, 5pt content insets, a 0.23s long
//! press, and a one-second refresh.
//!
//! Configs can be built in code with the `with_*` setters or loaded from TOML;
//! missing keys fall back to the defaults.
//!
//! ```rust
//! use tally_grid::GridConfig;
//!
//! let config = GridConfig::from_toml_str("margin = 16.0\nsection_gap = 32.0").unwrap();
//! assert_eq!(config.margin, 16.0);
//! assert_eq!(config.gap, 10.0);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_core::EdgeInsets;
use tally_layout::FlowConfig;

use crate::error::{GridError, Result};

const DEFAULT_LONG_PRESS_SECS: f32 = 0.23;
const DEFAULT_REFRESH_SECS: f32 = 1.0;

/// Configuration for a [`ButtonGridView`](crate::ButtonGridView)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Left and right inset of every line
    pub margin: f32,
    /// Horizontal space between buttons on a line
    pub gap: f32,
    /// Vertical space when a line wraps within a section
    pub line_gap: f32,
    /// Vertical space before a new section
    pub section_gap: f32,
    /// `y` of the first line
    pub top_inset: f32,
    /// Floor applied to every fitted button width
    pub min_button_width: f32,
    /// Padding between a button's title and its edges
    pub content_inset: f32,
    /// Title font size used for measurement
    pub font_size: f32,
    /// Minimum hold before a press counts as a long press (seconds)
    pub long_press_secs: f32,
    /// Period of the reconfiguration timer (seconds)
    pub refresh_interval_secs: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            margin: 10.0,
            gap: 10.0,
            line_gap: 10.0,
            section_gap: 20.0,
            top_inset: 20.0,
            min_button_width: 60.0,
            content_inset: 5.0,
            font_size: 17.0,
            long_press_secs: DEFAULT_LONG_PRESS_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
        }
    }
}

impl GridConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: GridConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the layout or timer cannot work with
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("margin", self.margin),
            ("gap", self.gap),
            ("line_gap", self.line_gap),
            ("section_gap", self.section_gap),
            ("top_inset", self.top_inset),
            ("min_button_width", self.min_button_width),
            ("content_inset", self.content_inset),
            ("long_press_secs", self.long_press_secs),
        ];
        for (field, value) in non_negative {
            if value < 0.0 || !value.is_finite() {
                return Err(GridError::InvalidConfig {
                    field,
                    reason: "must be a finite, non-negative number",
                });
            }
        }
        if self.font_size <= 0.0 || !self.font_size.is_finite() {
            return Err(GridError::InvalidConfig {
                field: "font_size",
                reason: "must be positive",
            });
        }
        if self.refresh_interval_secs <= 0.0 || !self.refresh_interval_secs.is_finite() {
            return Err(GridError::InvalidConfig {
                field: "refresh_interval_secs",
                reason: "must be a finite, positive number",
            });
        }
        Ok(())
    }

    /// The spacing subset consumed by the flow layout
    pub fn flow(&self) -> FlowConfig {
        FlowConfig {
            margin: self.margin,
            gap: self.gap,
            line_gap: self.line_gap,
            section_gap: self.section_gap,
            top_inset: self.top_inset,
        }
    }

    pub fn content_insets(&self) -> EdgeInsets {
        EdgeInsets::uniform(self.content_inset)
    }

    /// Long-press threshold; a value no `Duration` can hold means the default
    pub fn long_press_duration(&self) -> Duration {
        seconds_or_default("long_press_secs", self.long_press_secs, 0.0, DEFAULT_LONG_PRESS_SECS)
    }

    /// Refresh period, at least 1ms; a value no `Duration` can hold means the default
    pub fn refresh_interval(&self) -> Duration {
        seconds_or_default(
            "refresh_interval_secs",
            self.refresh_interval_secs,
            0.001,
            DEFAULT_REFRESH_SECS,
        )
    }

    /// Set margin and gap together (they share one constant by default)
    pub fn with_padding(mut self, padding: f32) -> Self {
        self.margin = padding;
        self.gap = padding;
        self.line_gap = padding;
        self
    }

    pub fn with_section_gap(mut self, gap: f32) -> Self {
        self.section_gap = gap;
        self
    }

    pub fn with_min_button_width(mut self, width: f32) -> Self {
        self.min_button_width = width;
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_long_press(mut self, duration: Duration) -> Self {
        self.long_press_secs = duration.as_secs_f32();
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval_secs = interval.as_secs_f32();
        self
    }
}

fn seconds_or_default(field: &str, secs: f32, floor: f32, default: f32) -> Duration {
    let converted = if secs.is_finite() {
        Duration::try_from_secs_f32(secs.max(floor)).ok()
    } else {
        None
    };
    converted.unwrap_or_else(|| {
        tracing::warn!("GridConfig: {} = {} is out of range, using {}", field, secs, default);
        Duration::from_secs_f32(default)
    })
}
