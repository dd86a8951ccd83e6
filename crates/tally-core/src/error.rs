//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Series / code rule violations                  │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised by the pure series and stock rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A series configuration cannot produce valid codes.
    ///
    /// ## When This Occurs
    /// - Empty prefix or series name
    /// - `code_length` leaves no room for counter digits
    #[error("Invalid series configuration for '{series}': {reason}")]
    InvalidSeriesConfig { series: String, reason: String },

    /// The counter outgrew the digits available for this series and period.
    ///
    /// Fatal for that series/period. Not retried: a later value is only
    /// larger. The fix is a longer `code_length` or a shorter prefix.
    #[error("Code space exhausted for series '{series}' (period {period}): value {value} needs more than {digits} digits")]
    CodeSpaceExhausted {
        series: String,
        period: String,
        value: i64,
        digits: usize,
    },

    /// A code string does not match its series layout.
    #[error("Code '{code}' does not match series '{series}': {reason}")]
    MalformedCode {
        series: String,
        code: String,
        reason: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any counter is reserved or any stock is moved.
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// A document needs at least one line.
    #[error("{document} must have at least one line item")]
    NoLines { document: String },

    /// An amount does not fit in 64-bit cents.
    #[error("{field} is too large")]
    AmountOverflow { field: String },

    /// The same line id appears twice in one submission.
    #[error("line item {line_id} appears more than once")]
    DuplicateLine { line_id: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_space_message_names_series_and_period() {
        let err = CoreError::CodeSpaceExhausted {
            series: "purchase".to_string(),
            period: "2024".to_string(),
            value: 1_000_000,
            digits: 6,
        };
        assert_eq!(
            err.to_string(),
            "Code space exhausted for series 'purchase' (period 2024): value 1000000 needs more than 6 digits"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err: CoreError = ValidationError::NoLines {
            document: "purchase".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation error: purchase must have at least one line item"
        );
    }
}
