//! # Campaign Engine
//!
//! Evaluates every active campaign against a committed settlement and
//! grants the resulting coupons.
//!
//! ## Evaluation Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Campaign Evaluation (one SQL transaction)                  │
//! │                                                                         │
//! │  claim outbox row (pending → done)                                      │
//! │       │ zero rows? already evaluated ──► ROLLBACK, grant nothing        │
//! │       ▼                                                                 │
//! │  1. Explicit bundle purchase (campaign_id on the request)               │
//! │     └── one PAID_PACKAGE coupon; failures are hard errors               │
//! │  2. Auto-spend: every campaign with amount_after ≥ min_spend fires      │
//! │     └── one AUTO_REWARD coupon each                                     │
//! │  3. Price-matched bundle (only without an explicit campaign_id)         │
//! │     └── price within one cent ⇒ usage_limit PAID_PACKAGE coupons        │
//! │  4. Stamp cards: upsert-increment the counter; at target_count,         │
//! │     one STAMP_REWARD coupon and reset to 0                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← claim and grants succeed or fail together                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The claim is the idempotency gate: re-running evaluation for the same
//! transaction id, from any caller, grants nothing.

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use perk_core::{
    Campaign, CampaignKind, CouponSource, GrantedReward, RewardOutboxEntry, Transaction,
};
use perk_db::repository::coupon::issue_in;
use perk_db::repository::outbox::claim_in;
use perk_db::repository::progress::{increment_in, reset_in};
use perk_db::{Database, DbError};

/// Evaluates campaigns for settled transactions.
#[derive(Debug, Clone)]
pub struct CampaignEngine {
    db: Database,
}

impl CampaignEngine {
    /// Creates a new CampaignEngine.
    pub fn new(db: Database) -> Self {
        CampaignEngine { db }
    }

    /// Runs the full evaluation for a committed transaction.
    ///
    /// `campaign_id` is the explicit bundle the operator selected, if any.
    /// Returns the granted rewards, or an empty list when the transaction
    /// was already evaluated.
    pub async fn evaluate(
        &self,
        transaction: &Transaction,
        campaign_id: Option<&str>,
    ) -> EngineResult<Vec<GrantedReward>> {
        // Candidate campaigns are read outside the claim transaction;
        // the grants themselves are guarded by the claim.
        let explicit = match campaign_id {
            Some(id) => Some(self.load_bundle(id).await?),
            None => None,
        };
        let auto_spend = self
            .db
            .campaigns()
            .list_active_by_kind(CampaignKind::AutoSpend)
            .await?;
        let bundles = self
            .db
            .campaigns()
            .list_active_by_kind(CampaignKind::Bundle)
            .await?;

        let amount_after = transaction.amount_after();
        let mut granted = Vec::new();

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        if !claim_in(&mut tx, &transaction.id).await? {
            debug!(
                transaction_id = %transaction.id,
                "Evaluation already ran for this transaction"
            );
            tx.rollback().await.map_err(DbError::from)?;
            return Ok(Vec::new());
        }

        if let Some(campaign) = &explicit {
            issue_in(
                &mut tx,
                campaign,
                &transaction.customer_id,
                CouponSource::PaidPackage,
                Some(&transaction.id),
            )
            .await?;
            granted.push(reward_of(campaign));
        }

        for campaign in &auto_spend {
            if matches!(campaign.min_spend_cents, Some(min) if amount_after.cents() >= min) {
                issue_in(
                    &mut tx,
                    campaign,
                    &transaction.customer_id,
                    CouponSource::AutoReward,
                    Some(&transaction.id),
                )
                .await?;
                granted.push(reward_of(campaign));
            }
        }

        // Legacy path: a charge equal to a paid bundle's price counts as a
        // purchase of that bundle when the operator selected no campaign.
        if explicit.is_none() {
            for campaign in bundles.iter().filter(|c| c.is_paid_bundle()) {
                if campaign.price().matches_within_cent(amount_after) {
                    for _ in 0..campaign.usage_limit {
                        issue_in(
                            &mut tx,
                            campaign,
                            &transaction.customer_id,
                            CouponSource::PaidPackage,
                            Some(&transaction.id),
                        )
                        .await?;
                        granted.push(reward_of(campaign));
                    }
                }
            }
        }

        for campaign in bundles.iter().filter(|c| c.is_stamp_card()) {
            let Some(target) = campaign.target_count else {
                continue;
            };
            if target <= 0 {
                continue;
            }

            let count =
                increment_in(&mut tx, &transaction.customer_id, &campaign.id, target).await?;
            if count >= target {
                issue_in(
                    &mut tx,
                    campaign,
                    &transaction.customer_id,
                    CouponSource::StampReward,
                    Some(&transaction.id),
                )
                .await?;
                reset_in(&mut tx, &transaction.customer_id, &campaign.id).await?;
                granted.push(reward_of(campaign));
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            transaction_id = %transaction.id,
            customer_id = %transaction.customer_id,
            granted = granted.len(),
            "Campaign evaluation committed"
        );

        Ok(granted)
    }

    /// Re-runs evaluation for an outbox entry (worker retry path).
    pub async fn evaluate_outbox_entry(
        &self,
        entry: &RewardOutboxEntry,
    ) -> EngineResult<Vec<GrantedReward>> {
        let transaction = self
            .db
            .transactions()
            .get_by_id(&entry.transaction_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Transaction", &entry.transaction_id))?;

        self.evaluate(&transaction, entry.campaign_id.as_deref())
            .await
    }

    /// Loads and checks the explicitly purchased bundle campaign.
    ///
    /// Settlement also calls this before its money transaction so a bad
    /// `campaign_id` fails with zero side effects.
    pub(crate) async fn load_bundle(&self, campaign_id: &str) -> EngineResult<Campaign> {
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
        if campaign.kind != CampaignKind::Bundle {
            return Err(EngineError::invalid_state(
                "Campaign",
                campaign_id,
                "not a bundle",
            ));
        }

        Ok(campaign)
    }
}

fn reward_of(campaign: &Campaign) -> GrantedReward {
    GrantedReward {
        name: campaign.name.clone(),
        kind: campaign.reward_kind,
    }
}
