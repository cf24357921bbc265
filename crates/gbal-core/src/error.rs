//! Unified error type for the gbal workspace
//!
//! Every fallible operation in the library crates returns [`GbalResult`]. The
//! variants separate malformed input (configuration, validation) from failures
//! of the network model itself (unknown elements, variant misuse) so callers can
//! decide what is recoverable.
//!
//! # Example
//!
//! ```ignore
//! use gbal_core::{GbalError, GbalResult};
//!
//! fn checked_threshold(value: f64) -> GbalResult<f64> {
//!     if value < 0.0 {
//!         return Err(GbalError::Config("threshold must be positive".into()));
//!     }
//!     Ok(value)
//! }
//! ```

use thiserror::Error;

/// Error type shared by all gbal crates.
#[derive(Error, Debug)]
pub enum GbalError {
    /// I/O errors (case files, parameter files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Load-flow or linear-solver errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors (bad parameters, ill-posed areas or scalables)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network structure errors (unknown elements, dangling references)
    #[error("Network error: {0}")]
    Network(String),

    /// Variant manager misuse (unknown id, duplicate id, removing the working variant)
    #[error("Variant error: {0}")]
    Variant(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GbalError.
pub type GbalResult<T> = Result<T, GbalError>;

impl From<anyhow::Error> for GbalError {
    fn from(err: anyhow::Error) -> Self {
        GbalError::Other(err.to_string())
    }
}

impl From<String> for GbalError {
    fn from(s: String) -> Self {
        GbalError::Other(s)
    }
}

impl From<&str> for GbalError {
    fn from(s: &str) -> Self {
        GbalError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GbalError {
    fn from(err: serde_json::Error) -> Self {
        GbalError::Parse(err.to_string())
    }
}
