//! # Coupon Service
//!
//! Administrative coupon operations: manual grants, active listings, and
//! bulk voids. Redemption lives in the settlement path.

use tracing::info;

use crate::error::{EngineError, EngineResult};
use perk_core::{CouponSource, CustomerCoupon};
use perk_db::repository::coupon::ActiveCoupon;
use perk_db::Database;

/// Coupon operations for the admin surface and operator consoles.
#[derive(Debug, Clone)]
pub struct CouponService {
    db: Database,
}

impl CouponService {
    /// Creates a new CouponService.
    pub fn new(db: Database) -> Self {
        CouponService { db }
    }

    /// Grants a MANUAL coupon from a campaign to a customer.
    ///
    /// Any campaign kind may be granted manually; the campaign only has to
    /// be active. `reason` goes to the audit log, not the database.
    pub async fn grant_manual(
        &self,
        customer_id: &str,
        campaign_id: &str,
        reason: &str,
    ) -> EngineResult<CustomerCoupon> {
        let customer = self
            .db
            .customers()
            .get_by_id(customer_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| EngineError::not_found("Customer", customer_id))?;

        let campaign = self
            .db
            .campaigns()
            .get_by_id(campaign_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Campaign", campaign_id))?;

        if !campaign.is_active {
            return Err(EngineError::invalid_state(
                "Campaign",
                campaign_id,
                "inactive",
            ));
        }

        let coupon = self
            .db
            .coupons()
            .issue(&campaign, &customer.id, CouponSource::Manual, None)
            .await?;

        info!(
            coupon_id = %coupon.id,
            customer_id = %customer.id,
            campaign_id = %campaign.id,
            reason = %reason,
            "Manual coupon granted"
        );

        Ok(coupon)
    }

    /// Lists a customer's active, unexpired coupons with campaign info.
    pub async fn active_coupons(&self, customer_id: &str) -> EngineResult<Vec<ActiveCoupon>> {
        Ok(self.db.coupons().list_active(customer_id).await?)
    }

    /// Voids every active coupon a customer holds. Returns the count.
    pub async fn void_all(&self, customer_id: &str) -> EngineResult<u64> {
        Ok(self.db.coupons().void_all_active(customer_id).await?)
    }
}
