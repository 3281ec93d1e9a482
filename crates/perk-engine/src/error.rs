//! # Engine Error Type
//!
//! The error taxonomy terminals see.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Perk POS                               │
//! │                                                                         │
//! │  Terminal                     Settlement Engine                         │
//! │  ────────                     ─────────────────                         │
//! │                                                                         │
//! │  settle(request)                                                        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Service Method                                                  │  │
//! │  │  Result<T, EngineError>                                          │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::NotFound ──────────┐              │  │
//! │  │         │                                        ▼              │  │
//! │  │  Validation Error? ── ValidationError ──── EngineError ────────►│  │
//! │  │         │                                                        │  │
//! │  │  Business rule?  ── InvalidState / Expired / InsufficientFunds ─►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "INSUFFICIENT_FUNDS", "message": "..." }                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure before the settlement commit has zero side effects: either
//! the request never touched the database, or the enclosing SQL transaction
//! rolled back.

use serde::Serialize;
use thiserror::Error;

use perk_core::{Money, ValidationError};
use perk_db::DbError;

/// Settlement engine errors.
///
/// Each variant carries a stable machine-readable [`ErrorCode`] so terminals
/// can branch on the category without parsing messages.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request failed input validation. Never has side effects.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist (or is not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The entity exists but its lifecycle state forbids the operation,
    /// e.g. redeeming a USED coupon or purchasing an inactive campaign.
    #[error("{entity} {id} is {state}")]
    InvalidState {
        entity: String,
        id: String,
        state: String,
    },

    /// The entity's expiry has passed (card or coupon).
    #[error("{entity} expired: {id}")]
    Expired { entity: String, id: String },

    /// Wallet balance does not cover the charge. The settlement rolled back.
    #[error("insufficient wallet balance: {required} required, {available} available")]
    InsufficientFunds { required: Money, available: Money },

    /// Terminal authentication failed (unknown id, bad secret, or inactive).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure. Details are logged, not surfaced.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable error categories for terminal-side handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    InvalidState,
    Expired,
    InsufficientFunds,
    Unauthorized,
    Internal,
}

impl EngineError {
    /// Creates a not found error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        EngineError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            state: state.into(),
        }
    }

    /// Creates an expired error.
    pub fn expired(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::Expired {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// The machine-readable category of this error.
    pub const fn code(&self) -> ErrorCode {
        match self {
            EngineError::Validation(_) => ErrorCode::ValidationError,
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::InvalidState { .. } => ErrorCode::InvalidState,
            EngineError::Expired { .. } => ErrorCode::Expired,
            EngineError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            EngineError::Unauthorized(_) => ErrorCode::Unauthorized,
            EngineError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Converts database errors to engine errors.
///
/// `NotFound` keeps its identity; everything else is an infrastructure
/// failure whose detail is logged here and hidden from the terminal.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => {
                tracing::error!(error = %other, "Database error during settlement");
                EngineError::Internal("database operation failed".to_string())
            }
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let err = EngineError::InsufficientFunds {
            required: Money::from_cents(3_000),
            available: Money::from_cents(1_000),
        };
        assert_eq!(err.code(), ErrorCode::InsufficientFunds);
        assert_eq!(
            serde_json::to_string(&err.code()).unwrap(),
            "\"INSUFFICIENT_FUNDS\""
        );
    }

    #[test]
    fn test_db_not_found_keeps_identity() {
        let err: EngineError = DbError::not_found("Customer", "c1").into();
        assert!(matches!(err, EngineError::NotFound { .. }));
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_db_infrastructure_errors_are_internal() {
        let err: EngineError = DbError::PoolExhausted.into();
        assert_eq!(err.code(), ErrorCode::Internal);
    }
}
