//! Error types for the billflow-core crate.
//!
//! The domain layer is almost entirely total — defensive recovery is
//! preferred over failure — so [`CoreError`] covers only the places where
//! rejecting bad input is the correct behavior.

use thiserror::Error;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the domain layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A line-item quantity was negative or not a finite number.
    #[error("invalid quantity: {value}")]
    InvalidQuantity { value: f64 },

    /// A line-item rate was negative or not a finite number.
    #[error("invalid rate: {value}")]
    InvalidRate { value: f64 },

    /// A line-item total override was not a finite number.
    #[error("invalid total: {value}")]
    InvalidTotal { value: f64 },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
