//! # Error Types
//!
//! Domain-specific error types for perk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  perk-core errors (this file)                                           │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  perk-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  perk-engine errors                                                     │
//! │  └── EngineError      - The settlement taxonomy terminals see           │
//! │                                                                         │
//! │  Flow: ValidationError / DbError → EngineError → terminal               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, id, limits)
//! 3. Errors are enum variants, never String

use thiserror::Error;

/// Input validation errors.
///
/// These errors occur when a settlement request doesn't meet requirements.
/// Used for early validation before business logic runs; they always surface
/// with zero side effects.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Mutually exclusive fields were combined.
    #[error("at most one of {fields:?} may be provided")]
    Exclusive { fields: Vec<&'static str> },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        assert_eq!(err.to_string(), "amount must be positive");

        let err = ValidationError::Exclusive {
            fields: vec!["discount_id", "coupon_id", "campaign_id"],
        };
        assert_eq!(
            err.to_string(),
            "at most one of [\"discount_id\", \"coupon_id\", \"campaign_id\"] may be provided"
        );
    }
}
