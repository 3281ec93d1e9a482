//! # Settlement Orchestrator
//!
//! The single entry point terminals call to settle a charge or top up a
//! wallet.
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Settlement Pipeline                                │
//! │                                                                         │
//! │  1. Validate: amount > 0, at most one reward reference, manual          │
//! │     discount sanity. Failures have zero side effects.                   │
//! │  2. Resolve: active customer + linked card; discount/coupon → reward;   │
//! │     amount_after = core reward math (automatic, then manual, clamp 0)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. ┌───────────────── SINGLE SQL TRANSACTION ─────────────────────┐    │
//! │     │  INSERT transactions row (COMPLETED)                         │    │
//! │     │  WALLET? conditional debit + WITHDRAWAL ledger row           │    │
//! │     │          zero rows ⇒ ROLLBACK ⇒ InsufficientFunds            │    │
//! │     │  INSERT OR IGNORE reward_outbox (pending)                    │    │
//! │     └──────────────────────────┬───────────────────────────────────┘    │
//! │                                │ COMMIT                                 │
//! │                                ▼                                        │
//! │  4. Post-commit: coupon ACTIVE → USED via conditional guard;            │
//! │     inline campaign evaluation (claims the outbox row).                 │
//! │     Bundle-purchase failures escalate; anything else is logged and      │
//! │     left pending for the reward worker. Never silently lost.            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  5. Respond { status, transaction_id, amount_after, new_rewards,        │
//! │              updated customer }                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::campaign::CampaignEngine;
use crate::error::{EngineError, EngineResult};
use crate::rewards;
use perk_core::validation::{
    validate_amount, validate_id, validate_manual_discount, validate_reward_reference,
};
use perk_core::{
    resolve_amount, Card, Customer, GrantedReward, ManualDiscount, Money, MovementKind,
    PaymentMethod, Transaction, TransactionStatus,
};
use perk_db::repository::coupon::RedeemOutcome;
use perk_db::repository::outbox::enqueue_in;
use perk_db::repository::transaction::insert_in;
use perk_db::repository::wallet::debit_if_sufficient_in;
use perk_db::{Database, DbError};

/// A settlement request from an operator console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// Customer being charged. Resolved from a scan by [`LookupService`]
    /// before the console submits the settlement.
    ///
    /// [`LookupService`]: crate::lookup::LookupService
    pub customer_id: String,
    /// Card presented at the terminal. Must be active, unexpired, and
    /// linked to `customer_id`.
    pub card_id: String,
    /// Charge (or top-up) amount in cents. Must be positive.
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    /// Wallet top-up instead of a charge; skips all reward logic.
    #[serde(default)]
    pub is_topup: bool,
    /// At most one of the following three may be set.
    #[serde(default)]
    pub discount_id: Option<String>,
    #[serde(default)]
    pub coupon_id: Option<String>,
    /// Explicit bundle purchase.
    #[serde(default)]
    pub campaign_id: Option<String>,
    /// Operator-entered discount, stacked on top of the automatic reward.
    #[serde(default)]
    pub manual_discount: Option<ManualDiscount>,
    /// Operator on the console, for the ledger audit trail.
    #[serde(default)]
    pub admin_id: Option<String>,
}

/// The settlement outcome returned to the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResponse {
    pub status: TransactionStatus,
    /// `None` for top-ups, which settle no charge.
    pub transaction_id: Option<String>,
    pub amount_after: Money,
    pub new_rewards: Vec<GrantedReward>,
    /// Re-read after the commit; `balance_cents` reflects this settlement.
    pub customer: Customer,
}

/// Orchestrates charges and top-ups end to end.
#[derive(Debug, Clone)]
pub struct SettlementService {
    db: Database,
    campaigns: CampaignEngine,
}

impl SettlementService {
    /// Creates a new SettlementService.
    pub fn new(db: Database) -> Self {
        SettlementService {
            campaigns: CampaignEngine::new(db.clone()),
            db,
        }
    }

    /// Settles a charge (or performs a top-up) for a customer and card.
    pub async fn settle(&self, request: SettlementRequest) -> EngineResult<SettlementResponse> {
        validate_id("customer_id", &request.customer_id)?;
        validate_id("card_id", &request.card_id)?;
        let amount = Money::from_cents(request.amount_cents);
        validate_amount(amount)?;

        let customer = self
            .db
            .customers()
            .get_by_id(&request.customer_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| EngineError::not_found("Customer", &request.customer_id))?;

        let card = self.resolve_card(&request.card_id, &customer.id).await?;

        if request.is_topup {
            return self
                .top_up(&customer.id, amount, request.admin_id.as_deref())
                .await;
        }

        validate_reward_reference(
            request.discount_id.as_deref(),
            request.coupon_id.as_deref(),
            request.campaign_id.as_deref(),
        )?;
        if let Some(manual) = request.manual_discount {
            validate_manual_discount(&manual)?;
        }
        if let Some(campaign_id) = request.campaign_id.as_deref() {
            // Fails before any write when the selected bundle is not
            // purchasable.
            self.campaigns.load_bundle(campaign_id).await?;
        }

        let automatic = if let Some(discount_id) = request.discount_id.as_deref() {
            Some(rewards::resolve_discount(&self.db, discount_id).await?)
        } else if let Some(coupon_id) = request.coupon_id.as_deref() {
            Some(rewards::resolve_coupon(&self.db, &customer.id, coupon_id).await?)
        } else {
            None
        };

        let amount_after = resolve_amount(amount, automatic.as_ref(), request.manual_discount);

        // Early refusal on the balance we just read; the conditional debit
        // inside the transaction is the authority under concurrency.
        if request.payment_method == PaymentMethod::Wallet && customer.balance() < amount_after {
            return Err(EngineError::InsufficientFunds {
                required: amount_after,
                available: customer.balance(),
            });
        }

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            card_id: card.id.clone(),
            discount_id: request.discount_id.clone(),
            coupon_id: request.coupon_id.clone(),
            amount_before_cents: amount.cents(),
            amount_after_cents: amount_after.cents(),
            payment_method: request.payment_method,
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        };

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        insert_in(&mut tx, &transaction).await?;

        if request.payment_method == PaymentMethod::Wallet && amount_after.is_positive() {
            let debited = debit_if_sufficient_in(
                &mut tx,
                &customer.id,
                amount_after,
                &transaction.id,
                request.admin_id.as_deref(),
            )
            .await?;

            if !debited {
                tx.rollback().await.map_err(DbError::from)?;
                let available = self.db.wallet().balance(&customer.id).await?;
                return Err(EngineError::InsufficientFunds {
                    required: amount_after,
                    available,
                });
            }
        }

        enqueue_in(&mut tx, &transaction.id, request.campaign_id.as_deref()).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            transaction_id = %transaction.id,
            customer_id = %customer.id,
            amount_before = %amount,
            amount_after = %amount_after,
            method = ?request.payment_method,
            "Settlement committed"
        );

        // The charge is durable from here on. Consume the coupon through
        // the conditional guard; a lost race means another settlement beat
        // us to it after resolution.
        if let Some(coupon_id) = request.coupon_id.as_deref() {
            match self.db.coupons().redeem(coupon_id, &customer.id).await {
                Ok(RedeemOutcome::Redeemed(_)) => {}
                Ok(outcome) => warn!(
                    coupon_id = %coupon_id,
                    outcome = ?outcome,
                    "Coupon was not redeemable after commit"
                ),
                Err(e) => warn!(
                    coupon_id = %coupon_id,
                    error = %e,
                    "Coupon redemption failed after commit"
                ),
            }
        }

        // Inline evaluation. An explicit bundle purchase that cannot grant
        // is a hard error; anything else stays pending for the worker.
        let new_rewards = match self
            .campaigns
            .evaluate(&transaction, request.campaign_id.as_deref())
            .await
        {
            Ok(rewards) => rewards,
            Err(err) if request.campaign_id.is_some() => return Err(err),
            Err(err) => {
                warn!(
                    transaction_id = %transaction.id,
                    error = %err,
                    "Campaign evaluation deferred to the reward worker"
                );
                Vec::new()
            }
        };

        let customer = self.reload_customer(&customer.id).await?;

        Ok(SettlementResponse {
            status: TransactionStatus::Completed,
            transaction_id: Some(transaction.id),
            amount_after,
            new_rewards,
            customer,
        })
    }

    /// Loads the presented card and checks it may settle for this customer.
    async fn resolve_card(&self, card_id: &str, customer_id: &str) -> EngineResult<Card> {
        let card = self
            .db
            .customers()
            .get_card_by_id(card_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Card", card_id))?;

        if card.customer_id.as_deref() != Some(customer_id) {
            return Err(EngineError::invalid_state(
                "Card",
                card_id,
                "not linked to this customer",
            ));
        }
        if !card.is_active {
            return Err(EngineError::invalid_state("Card", card_id, "inactive"));
        }
        if card.is_expired_at(Utc::now()) {
            return Err(EngineError::expired("Card", card_id));
        }

        Ok(card)
    }

    /// Deposits into the wallet, bypassing all reward logic.
    async fn top_up(
        &self,
        customer_id: &str,
        amount: Money,
        admin_id: Option<&str>,
    ) -> EngineResult<SettlementResponse> {
        self.db
            .wallet()
            .record_movement(
                customer_id,
                amount,
                MovementKind::Deposit,
                "top_up",
                None,
                admin_id,
            )
            .await?;

        info!(customer_id = %customer_id, amount = %amount, "Wallet topped up");

        let customer = self.reload_customer(customer_id).await?;

        Ok(SettlementResponse {
            status: TransactionStatus::Completed,
            transaction_id: None,
            amount_after: amount,
            new_rewards: Vec::new(),
            customer,
        })
    }

    async fn reload_customer(&self, customer_id: &str) -> EngineResult<Customer> {
        self.db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Customer", customer_id))
    }
}
