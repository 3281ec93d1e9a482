//! # Reward Selection Resolution
//!
//! Resolves the operator's reward selection (`discount_id` or `coupon_id`)
//! to the [`RewardConfig`] the core math applies. The coupon is validated
//! here but **not consumed**: the ACTIVE → USED transition happens after the
//! settlement commits, through the conditional guard in the coupon
//! repository.

use chrono::Utc;

use crate::error::{EngineError, EngineResult};
use perk_core::{CouponStatus, RewardConfig};
use perk_db::Database;

/// Resolves a selected instant discount to its reward config.
pub async fn resolve_discount(db: &Database, discount_id: &str) -> EngineResult<RewardConfig> {
    let discount = db
        .discounts()
        .get_by_id(discount_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Discount", discount_id))?;

    if !discount.is_active {
        return Err(EngineError::invalid_state(
            "Discount",
            discount_id,
            "inactive",
        ));
    }

    Ok(RewardConfig {
        kind: discount.kind,
        value: discount.value,
        // Instant discounts apply immediately; no coupon is ever minted
        // from this config.
        validity_days: 0,
    })
}

/// Validates a selected coupon and resolves its campaign's reward config.
///
/// The coupon must be ACTIVE, owned by `customer_id`, and unexpired. An
/// expired-but-still-ACTIVE row surfaces as `Expired` here; the lazy
/// transition is persisted when the redemption guard runs.
pub async fn resolve_coupon(
    db: &Database,
    customer_id: &str,
    coupon_id: &str,
) -> EngineResult<RewardConfig> {
    let coupon = db
        .coupons()
        .get_by_id(coupon_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Coupon", coupon_id))?;

    // A coupon held by someone else is indistinguishable from a missing one.
    if coupon.customer_id != customer_id {
        return Err(EngineError::not_found("Coupon", coupon_id));
    }

    // Resolution previews the ACTIVE → USED transition; anything the state
    // machine would reject at redemption is rejected here too.
    if !coupon.status.can_transition_to(CouponStatus::Used) {
        return Err(EngineError::invalid_state(
            "Coupon",
            coupon_id,
            status_label(coupon.status),
        ));
    }

    if coupon.is_expired_at(Utc::now()) {
        return Err(EngineError::expired("Coupon", coupon_id));
    }

    let campaign = db
        .campaigns()
        .get_by_id(&coupon.campaign_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Campaign", &coupon.campaign_id))?;

    Ok(campaign.reward_config())
}

fn status_label(status: CouponStatus) -> &'static str {
    match status {
        CouponStatus::Active => "active",
        CouponStatus::Used => "used",
        CouponStatus::Expired => "expired",
        CouponStatus::Voided => "voided",
    }
}
