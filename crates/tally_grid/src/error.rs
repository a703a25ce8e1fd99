//! Grid error types
//!
//! Grid operations themselves never fail; only loading and validating a
//! [`GridConfig`](crate::config::GridConfig) can.

use thiserror::Error;

/// Grid configuration errors
#[derive(Error, Debug)]
pub enum GridError {
    /// The TOML source could not be parsed
    #[error("Failed to parse grid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The config parsed but holds an unusable value
    #[error("Invalid grid config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}

/// Result type for grid configuration
pub type Result<T> = std::result::Result<T, GridError>;
