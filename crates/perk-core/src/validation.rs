//! # Validation Module
//!
//! Input validation utilities for settlement requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Terminal / operator console                                   │
//! │  └── Basic format checks, immediate feedback                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                        │
//! │  └── Runs before any database write; failures have zero side effects    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  └── NOT NULL / CHECK / UNIQUE / foreign key constraints                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;
use crate::reward::ManualDiscount;
use crate::types::RewardKind;

/// Maximum manual percentage discount an operator can enter.
pub const MAX_MANUAL_PERCENT: i64 = 100;

/// Validates a settlement or top-up amount.
///
/// ## Example
/// ```rust
/// use perk_core::money::Money;
/// use perk_core::validation::validate_amount;
///
/// assert!(validate_amount(Money::from_cents(100)).is_ok());
/// assert!(validate_amount(Money::zero()).is_err());
/// assert!(validate_amount(Money::from_cents(-1)).is_err());
/// ```
pub fn validate_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates that at most one reward reference was selected.
///
/// The operator picks none or exactly one of: an instant discount, a coupon
/// to redeem, or a bundle campaign to purchase.
pub fn validate_reward_reference(
    discount_id: Option<&str>,
    coupon_id: Option<&str>,
    campaign_id: Option<&str>,
) -> ValidationResult<()> {
    let selected = [discount_id, coupon_id, campaign_id]
        .iter()
        .filter(|r| r.is_some())
        .count();

    if selected > 1 {
        return Err(ValidationError::Exclusive {
            fields: vec!["discount_id", "coupon_id", "campaign_id"],
        });
    }
    Ok(())
}

/// Validates an operator-entered manual discount.
///
/// ## Rules
/// - Value must be positive
/// - Percentage discounts are capped at 100
pub fn validate_manual_discount(manual: &ManualDiscount) -> ValidationResult<()> {
    if manual.value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "manual_discount".to_string(),
        });
    }

    if manual.kind == RewardKind::Percentage && manual.value > MAX_MANUAL_PERCENT {
        return Err(ValidationError::OutOfRange {
            field: "manual_discount".to_string(),
            min: 1,
            max: MAX_MANUAL_PERCENT,
        });
    }

    Ok(())
}

/// Validates a non-empty id field.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}
