//! # Error Types
//!
//! Domain-specific error types for verde-core.
//!
//! ## Error Flow
//! ```text
//! ValidationError → CoreError → DbError/BatchError (verde-db) → ApiError (api)
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field names, bounds, reasons)
//! 3. Errors are enum variants, never bare Strings
//! 4. Aggregation functions are total over well-formed input; the only
//!    failure a caller can see from the reporting core is `InvalidPeriod`

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested reporting period cannot be resolved.
    ///
    /// ## When This Occurs
    /// - month outside 1-12
    /// - a range where start > end
    /// - a bound that does not parse as a `YYYY-MM-DD` calendar date
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when user input doesn't meet requirements. Used for early
/// validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid RFC, invalid amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
