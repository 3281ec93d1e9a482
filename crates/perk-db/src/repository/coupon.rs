//! # Coupon Repository
//!
//! Issue / redeem / expire / void for per-customer coupon instances.
//!
//! ## Coupon Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Coupon Lifecycle                                  │
//! │                                                                         │
//! │                    ┌──────── ACTIVE ────────┐                           │
//! │                    │           │            │                           │
//! │        redemption  │     lazy expiry        │  bulk admin void          │
//! │                    ▼           ▼            ▼                           │
//! │                  USED       EXPIRED      VOIDED                         │
//! │                                                                         │
//! │  Terminal states never revert. Every transition is a conditional        │
//! │  UPDATE guarded by `status = 'active'`: when two terminals race to      │
//! │  redeem the same coupon, exactly one UPDATE matches a row and the       │
//! │  other observes zero rows affected.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use perk_core::coupon_code::generate_code;
use perk_core::{
    Campaign, CouponSource, CouponStatus, CustomerCoupon, RewardConfig, RewardKind,
};

/// Outcome of a redemption attempt.
///
/// Redemption is a state transition, not an error in itself; the engine maps
/// these to its error taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub enum RedeemOutcome {
    /// Coupon transitioned ACTIVE → USED; apply this reward.
    Redeemed(RewardConfig),
    /// Expiry was detected (and persisted) during this attempt.
    Expired,
    /// Coupon is in a terminal state already (USED, EXPIRED, or VOIDED).
    NotRedeemable(CouponStatus),
    /// Coupon belongs to a different customer.
    WrongOwner,
    /// No such coupon.
    NotFound,
}

/// Active coupon joined with its campaign's reward info, for listings.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ActiveCoupon {
    pub id: String,
    pub code: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub reward_kind: RewardKind,
    pub reward_value: i64,
    pub expires_at: DateTime<Utc>,
}

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Issues a new ACTIVE coupon for a campaign.
    pub async fn issue(
        &self,
        campaign: &Campaign,
        customer_id: &str,
        source: CouponSource,
        transaction_id: Option<&str>,
    ) -> DbResult<CustomerCoupon> {
        let mut tx = self.pool.begin().await?;
        let coupon = issue_in(&mut tx, campaign, customer_id, source, transaction_id).await?;
        tx.commit().await?;
        Ok(coupon)
    }

    /// Gets a coupon by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CustomerCoupon>> {
        let coupon = sqlx::query_as::<_, CustomerCoupon>(
            r#"
            SELECT id, customer_id, campaign_id, code, status, source,
                   transaction_id, expires_at, used_at, created_at
            FROM customer_coupons
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    /// Redeems a coupon for a customer.
    ///
    /// ## Idempotency
    /// The transition is a conditional UPDATE that only matches rows still
    /// in ACTIVE state. A second redemption of the same coupon matches zero
    /// rows and reports `NotRedeemable(Used)` - never a double discount.
    ///
    /// ## Lazy Expiry
    /// If the coupon's `expires_at` has passed, this attempt persists the
    /// ACTIVE → EXPIRED transition and reports `Expired` instead of
    /// redeeming.
    pub async fn redeem(&self, coupon_id: &str, customer_id: &str) -> DbResult<RedeemOutcome> {
        let now = Utc::now();

        // Lazy expiry first: a due coupon transitions instead of redeeming.
        // Scoped to the presenting customer so a non-owner attempt cannot
        // learn (or change) another customer's coupon state.
        let expired = sqlx::query(
            r#"
            UPDATE customer_coupons SET status = 'expired'
            WHERE id = ?1 AND customer_id = ?2 AND status = 'active' AND expires_at < ?3
            "#,
        )
        .bind(coupon_id)
        .bind(customer_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if expired.rows_affected() > 0 {
            debug!(coupon_id = %coupon_id, "Coupon expired at redemption time");
            return Ok(RedeemOutcome::Expired);
        }

        let redeemed = sqlx::query(
            r#"
            UPDATE customer_coupons SET status = 'used', used_at = ?3
            WHERE id = ?1 AND customer_id = ?2 AND status = 'active'
            "#,
        )
        .bind(coupon_id)
        .bind(customer_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if redeemed.rows_affected() == 0 {
            // Distinguish why the guard did not match.
            let coupon = self.get_by_id(coupon_id).await?;
            return Ok(match coupon {
                None => RedeemOutcome::NotFound,
                Some(c) if c.customer_id != customer_id => RedeemOutcome::WrongOwner,
                Some(c) => RedeemOutcome::NotRedeemable(c.status),
            });
        }

        debug!(coupon_id = %coupon_id, customer_id = %customer_id, "Coupon redeemed");

        let reward: (RewardKind, i64, i64) = sqlx::query_as(
            r#"
            SELECT cp.reward_kind, cp.reward_value, cp.validity_days
            FROM customer_coupons cc
            JOIN campaigns cp ON cp.id = cc.campaign_id
            WHERE cc.id = ?1
            "#,
        )
        .bind(coupon_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(RedeemOutcome::Redeemed(RewardConfig {
            kind: reward.0,
            value: reward.1,
            validity_days: reward.2,
        }))
    }

    /// Lists a customer's ACTIVE, unexpired coupons with campaign reward
    /// info, lazily persisting any due expirations first.
    pub async fn list_active(&self, customer_id: &str) -> DbResult<Vec<ActiveCoupon>> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE customer_coupons SET status = 'expired'
            WHERE customer_id = ?1 AND status = 'active' AND expires_at < ?2
            "#,
        )
        .bind(customer_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let coupons = sqlx::query_as::<_, ActiveCoupon>(
            r#"
            SELECT cc.id, cc.code, cc.campaign_id, cp.name AS campaign_name,
                   cp.reward_kind, cp.reward_value, cc.expires_at
            FROM customer_coupons cc
            JOIN campaigns cp ON cp.id = cc.campaign_id
            WHERE cc.customer_id = ?1 AND cc.status = 'active'
            ORDER BY cc.expires_at
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(coupons)
    }

    /// Voids every ACTIVE coupon a customer holds. Administrative reset.
    ///
    /// USED and EXPIRED rows are untouched: `voided` means "administratively
    /// cancelled", which reporting keeps distinct from "redeemed".
    pub async fn void_all_active(&self, customer_id: &str) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE customer_coupons SET status = 'voided'
            WHERE customer_id = ?1 AND status = 'active'
            "#,
        )
        .bind(customer_id)
        .execute(&self.pool)
        .await?;

        debug!(
            customer_id = %customer_id,
            voided = result.rows_affected(),
            "Voided active coupons"
        );

        Ok(result.rows_affected())
    }

    /// Coupons granted by a given settlement, for idempotency checks.
    pub async fn list_for_transaction(&self, transaction_id: &str) -> DbResult<Vec<CustomerCoupon>> {
        let coupons = sqlx::query_as::<_, CustomerCoupon>(
            r#"
            SELECT id, customer_id, campaign_id, code, status, source,
                   transaction_id, expires_at, used_at, created_at
            FROM customer_coupons
            WHERE transaction_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(coupons)
    }
}

/// Issues a coupon inside an existing transaction.
///
/// Campaign evaluation grants all of a settlement's coupons in one SQL
/// transaction together with the outbox claim.
pub async fn issue_in(
    conn: &mut SqliteConnection,
    campaign: &Campaign,
    customer_id: &str,
    source: CouponSource,
    transaction_id: Option<&str>,
) -> DbResult<CustomerCoupon> {
    let now = Utc::now();
    let coupon = CustomerCoupon {
        id: Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        campaign_id: campaign.id.clone(),
        code: generate_code(),
        status: CouponStatus::Active,
        source,
        transaction_id: transaction_id.map(str::to_string),
        expires_at: now + Duration::days(campaign.validity_days),
        used_at: None,
        created_at: now,
    };

    debug!(
        coupon_id = %coupon.id,
        campaign_id = %campaign.id,
        customer_id = %customer_id,
        source = ?source,
        "Issuing coupon"
    );

    sqlx::query(
        r#"
        INSERT INTO customer_coupons (
            id, customer_id, campaign_id, code, status, source,
            transaction_id, expires_at, used_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&coupon.id)
    .bind(&coupon.customer_id)
    .bind(&coupon.campaign_id)
    .bind(&coupon.code)
    .bind(coupon.status)
    .bind(coupon.source)
    .bind(&coupon.transaction_id)
    .bind(coupon.expires_at)
    .bind(coupon.used_at)
    .bind(coupon.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(coupon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{memory_db, seed_campaign};
    use perk_core::CampaignKind;

    #[tokio::test]
    async fn test_issue_and_redeem() {
        let db = memory_db().await;
        let customer = db.customers().create("Test").await.unwrap();
        let campaign = seed_campaign(&db, CampaignKind::Manual, |c| {
            c.reward_kind = RewardKind::Percentage;
            c.reward_value = 20;
        })
        .await;

        let coupon = db
            .coupons()
            .issue(&campaign, &customer.id, CouponSource::Manual, None)
            .await
            .unwrap();
        assert_eq!(coupon.status, CouponStatus::Active);
        assert_eq!(coupon.code.len(), 6);

        let outcome = db.coupons().redeem(&coupon.id, &customer.id).await.unwrap();
        match outcome {
            RedeemOutcome::Redeemed(reward) => {
                assert_eq!(reward.kind, RewardKind::Percentage);
                assert_eq!(reward.value, 20);
            }
            other => panic!("expected redemption, got {other:?}"),
        }

        let stored = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CouponStatus::Used);
        assert!(stored.used_at.is_some());
    }

    #[tokio::test]
    async fn test_double_redeem_is_rejected() {
        let db = memory_db().await;
        let customer = db.customers().create("Test").await.unwrap();
        let campaign = seed_campaign(&db, CampaignKind::Manual, |_| {}).await;

        let coupon = db
            .coupons()
            .issue(&campaign, &customer.id, CouponSource::Manual, None)
            .await
            .unwrap();

        let first = db.coupons().redeem(&coupon.id, &customer.id).await.unwrap();
        assert!(matches!(first, RedeemOutcome::Redeemed(_)));

        let second = db.coupons().redeem(&coupon.id, &customer.id).await.unwrap();
        assert_eq!(
            second,
            RedeemOutcome::NotRedeemable(CouponStatus::Used)
        );
    }

    #[tokio::test]
    async fn test_expired_coupon_transitions_lazily() {
        let db = memory_db().await;
        let customer = db.customers().create("Test").await.unwrap();
        let campaign = seed_campaign(&db, CampaignKind::Manual, |c| {
            // Already expired at issue time.
            c.validity_days = -1;
        })
        .await;

        let coupon = db
            .coupons()
            .issue(&campaign, &customer.id, CouponSource::Manual, None)
            .await
            .unwrap();

        let outcome = db.coupons().redeem(&coupon.id, &customer.id).await.unwrap();
        assert_eq!(outcome, RedeemOutcome::Expired);

        let stored = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CouponStatus::Expired);
        assert!(stored.used_at.is_none());
    }

    #[tokio::test]
    async fn test_wrong_owner_cannot_redeem() {
        let db = memory_db().await;
        let owner = db.customers().create("Owner").await.unwrap();
        let other = db.customers().create("Other").await.unwrap();
        let campaign = seed_campaign(&db, CampaignKind::Manual, |_| {}).await;

        let coupon = db
            .coupons()
            .issue(&campaign, &owner.id, CouponSource::Manual, None)
            .await
            .unwrap();

        let outcome = db.coupons().redeem(&coupon.id, &other.id).await.unwrap();
        assert_eq!(outcome, RedeemOutcome::WrongOwner);

        // Still redeemable by the rightful owner.
        let stored = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CouponStatus::Active);
    }

    #[tokio::test]
    async fn test_wrong_owner_does_not_trigger_lazy_expiry() {
        let db = memory_db().await;
        let owner = db.customers().create("Owner").await.unwrap();
        let other = db.customers().create("Other").await.unwrap();
        let campaign = seed_campaign(&db, CampaignKind::Manual, |c| {
            c.validity_days = -1;
        })
        .await;

        let coupon = db
            .coupons()
            .issue(&campaign, &owner.id, CouponSource::Manual, None)
            .await
            .unwrap();

        // A non-owner presenting an overdue coupon is told WrongOwner, and
        // the row is left untouched for the owner's own next attempt.
        let outcome = db.coupons().redeem(&coupon.id, &other.id).await.unwrap();
        assert_eq!(outcome, RedeemOutcome::WrongOwner);

        let stored = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CouponStatus::Active);

        // The owner's attempt then persists the expiry.
        let outcome = db.coupons().redeem(&coupon.id, &owner.id).await.unwrap();
        assert_eq!(outcome, RedeemOutcome::Expired);
    }

    #[tokio::test]
    async fn test_void_all_active_spares_used() {
        let db = memory_db().await;
        let customer = db.customers().create("Test").await.unwrap();
        let campaign = seed_campaign(&db, CampaignKind::Manual, |_| {}).await;

        let used = db
            .coupons()
            .issue(&campaign, &customer.id, CouponSource::Manual, None)
            .await
            .unwrap();
        db.coupons().redeem(&used.id, &customer.id).await.unwrap();

        let active = db
            .coupons()
            .issue(&campaign, &customer.id, CouponSource::Manual, None)
            .await
            .unwrap();

        let voided = db.coupons().void_all_active(&customer.id).await.unwrap();
        assert_eq!(voided, 1);

        let used_row = db.coupons().get_by_id(&used.id).await.unwrap().unwrap();
        assert_eq!(used_row.status, CouponStatus::Used);

        let voided_row = db.coupons().get_by_id(&active.id).await.unwrap().unwrap();
        assert_eq!(voided_row.status, CouponStatus::Voided);
    }

    #[tokio::test]
    async fn test_listing_expires_and_joins_campaign() {
        let db = memory_db().await;
        let customer = db.customers().create("Test").await.unwrap();
        let good = seed_campaign(&db, CampaignKind::Manual, |c| {
            c.name = "Evergreen".into();
        })
        .await;
        let stale = seed_campaign(&db, CampaignKind::Manual, |c| {
            c.validity_days = -1;
        })
        .await;

        db.coupons()
            .issue(&good, &customer.id, CouponSource::Manual, None)
            .await
            .unwrap();
        let dead = db
            .coupons()
            .issue(&stale, &customer.id, CouponSource::Manual, None)
            .await
            .unwrap();

        let listed = db.coupons().list_active(&customer.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].campaign_name, "Evergreen");

        let dead_row = db.coupons().get_by_id(&dead.id).await.unwrap().unwrap();
        assert_eq!(dead_row.status, CouponStatus::Expired);
    }
}
