//! # Reward Resolution
//!
//! Pure math for computing the final charge of a settlement.
//!
//! ## Stacking Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Reward Resolution                                  │
//! │                                                                         │
//! │  amount_before                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Automatic reward (at most one):                                     │
//! │     instant discount  OR  coupon reward config                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. Manual discount, applied to the ALREADY-discounted figure           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Clamp to minimum 0                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  amount_after                                                           │
//! │                                                                         │
//! │  Example: 100.00, coupon {percentage, 20}, manual 10%                   │
//! │           100.00 → 80.00 → 72.00                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolving a `discount_id`/`coupon_id` to a [`RewardConfig`] is I/O and
//! lives in perk-engine; this module only does the arithmetic.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{RewardConfig, RewardKind};

/// A manual discount typed in by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualDiscount {
    pub kind: RewardKind,
    /// Whole percent for `Percentage`, cents for `Fixed`.
    pub value: i64,
}

/// Applies a single reward to an amount.
///
/// Percentage rewards reduce by `value` percent of the current figure;
/// fixed rewards subtract `value` cents. The result is not clamped here:
/// clamping happens once, at the end of [`resolve_amount`].
pub fn apply_reward(amount: Money, kind: RewardKind, value: i64) -> Money {
    match kind {
        RewardKind::Percentage => amount.apply_percentage(value),
        RewardKind::Fixed => amount - Money::from_cents(value),
    }
}

/// Computes the final charge for a settlement.
///
/// `automatic` is the reward resolved from the operator's selection: an
/// instant discount's config or a validated coupon's campaign reward. The
/// manual discount stacks on top, automatic first. The result is clamped to
/// a minimum of exactly zero.
///
/// ## Example
/// ```rust
/// use perk_core::money::Money;
/// use perk_core::reward::{resolve_amount, ManualDiscount};
/// use perk_core::types::{RewardConfig, RewardKind};
///
/// let coupon = RewardConfig { kind: RewardKind::Percentage, value: 20, validity_days: 30 };
/// let manual = ManualDiscount { kind: RewardKind::Percentage, value: 10 };
///
/// let after = resolve_amount(Money::from_cents(10_000), Some(&coupon), Some(manual));
/// assert_eq!(after.cents(), 7_200); // 100.00 → 80.00 → 72.00
/// ```
pub fn resolve_amount(
    amount: Money,
    automatic: Option<&RewardConfig>,
    manual: Option<ManualDiscount>,
) -> Money {
    let mut after = amount;

    if let Some(reward) = automatic {
        after = apply_reward(after, reward.kind, reward.value);
    }

    if let Some(manual) = manual {
        after = apply_reward(after, manual.kind, manual.value);
    }

    after.clamp_non_negative()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(value: i64) -> RewardConfig {
        RewardConfig {
            kind: RewardKind::Percentage,
            value,
            validity_days: 30,
        }
    }

    fn fixed(value: i64) -> RewardConfig {
        RewardConfig {
            kind: RewardKind::Fixed,
            value,
            validity_days: 30,
        }
    }

    #[test]
    fn test_no_rewards_passes_through() {
        let after = resolve_amount(Money::from_cents(12_345), None, None);
        assert_eq!(after.cents(), 12_345);
    }

    #[test]
    fn test_percentage_coupon_alone() {
        // {percentage, 20} on 100.00 → 80.00
        let after = resolve_amount(Money::from_cents(10_000), Some(&pct(20)), None);
        assert_eq!(after.cents(), 8_000);
    }

    #[test]
    fn test_automatic_and_manual_stack_sequentially() {
        // 100.00 → 80.00 → 72.00, not 70.00
        let manual = ManualDiscount {
            kind: RewardKind::Percentage,
            value: 10,
        };
        let after = resolve_amount(Money::from_cents(10_000), Some(&pct(20)), Some(manual));
        assert_eq!(after.cents(), 7_200);
    }

    #[test]
    fn test_fixed_reward() {
        let after = resolve_amount(Money::from_cents(10_000), Some(&fixed(2_500)), None);
        assert_eq!(after.cents(), 7_500);
    }

    #[test]
    fn test_manual_fixed_on_top_of_fixed() {
        let manual = ManualDiscount {
            kind: RewardKind::Fixed,
            value: 1_000,
        };
        let after = resolve_amount(Money::from_cents(5_000), Some(&fixed(2_000)), Some(manual));
        assert_eq!(after.cents(), 2_000);
    }

    #[test]
    fn test_clamps_to_exactly_zero() {
        // Fixed discount larger than the charge clamps to 0.00, never negative.
        let manual = ManualDiscount {
            kind: RewardKind::Fixed,
            value: 9_000,
        };
        let after = resolve_amount(Money::from_cents(5_000), Some(&fixed(2_000)), Some(manual));
        assert_eq!(after, Money::zero());
    }

    #[test]
    fn test_hundred_percent_manual() {
        let manual = ManualDiscount {
            kind: RewardKind::Percentage,
            value: 100,
        };
        let after = resolve_amount(Money::from_cents(777), None, Some(manual));
        assert_eq!(after, Money::zero());
    }
}
