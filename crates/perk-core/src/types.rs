//! # Domain Types
//!
//! Core domain types used throughout Perk POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │    Campaign     │   │ CustomerCoupon  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  balance_cents  │◄──│  kind           │──►│  code           │       │
//! │  │  is_active      │   │  reward config  │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │           ▲                                                             │
//! │  ┌────────┴────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ WalletLedger    │   │   Transaction   │   │ CampaignProgress│       │
//! │  │  Entry (signed) │   │  (append-only)  │   │  (stamp count)  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (card `uid`, coupon `code`)
//!
//! ## Closed Status Enumerations
//! Coupon status was historically free text in systems like this one, with
//! case-inconsistent synonyms. Here every status is a closed enum stored as
//! TEXT, and coupon transitions are validated through
//! [`CouponStatus::can_transition_to`] plus conditional UPDATEs in the
//! database layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Enumerations
// =============================================================================

/// The kind of a marketing campaign. Drives which engine path evaluates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    /// Grants a coupon whenever a settled charge reaches `min_spend`.
    AutoSpend,
    /// A package: paid (price > 0, grants `usage_limit` coupons per
    /// purchase) or a stamp card (price = 0, accumulates progress).
    Bundle,
    /// Granted only by explicit admin action.
    Manual,
}

/// How a reward reduces a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Whole-percent reduction (value 20 = 20% off).
    Percentage,
    /// Fixed reduction in cents.
    Fixed,
}

/// Lifecycle status of a customer coupon.
///
/// Transitions are one-way: `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    /// Redeemable.
    Active,
    /// Consumed exactly once at settlement.
    Used,
    /// Past `expires_at`, detected lazily at redemption or listing time.
    Expired,
    /// Administratively cancelled. Distinct from `Used` for reporting.
    Voided,
}

impl CouponStatus {
    /// Whether this status may transition to `to`.
    ///
    /// Terminal states never revert; `Active` may move to any terminal
    /// state. The database layer enforces the same rule with conditional
    /// UPDATEs (`WHERE status = 'active'`).
    pub const fn can_transition_to(self, to: CouponStatus) -> bool {
        matches!(
            (self, to),
            (
                CouponStatus::Active,
                CouponStatus::Used | CouponStatus::Expired | CouponStatus::Voided
            )
        )
    }

    /// Whether the coupon can still be redeemed or voided.
    pub const fn is_active(self) -> bool {
        matches!(self, CouponStatus::Active)
    }
}

/// Where a coupon came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CouponSource {
    /// Granted by an admin.
    Manual,
    /// Purchased as part of a paid bundle.
    PaidPackage,
    /// Granted by an auto-spend campaign.
    AutoReward,
    /// Granted by a completed stamp card.
    StampReward,
}

/// How a settlement is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; the wallet is untouched.
    Cash,
    /// Stored-value wallet; requires sufficient balance before any write.
    Wallet,
}

/// Status of a settled transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Voided,
}

/// Direction of a wallet ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Positive signed amount (top-up).
    Deposit,
    /// Negative signed amount (wallet payment).
    Withdrawal,
}

/// Processing status of a reward outbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    /// Enqueued, not yet evaluated (or evaluation failed and will retry).
    Pending,
    /// Campaign evaluation committed.
    Done,
    /// Gave up after repeated failures; needs operator attention.
    Failed,
}

// =============================================================================
// Reward Configuration
// =============================================================================

/// A campaign's reward, as applied to a charge at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    pub kind: RewardKind,
    /// Whole percent for `Percentage`, cents for `Fixed`.
    pub value: i64,
    /// Coupons minted from this config expire this many days after issue.
    pub validity_days: i64,
}

// =============================================================================
// Entities
// =============================================================================

/// A loyalty customer.
///
/// `balance_cents` is a materialized sum over the wallet ledger. It is
/// mutated only through [`WalletLedgerEntry`] appends inside the wallet
/// repository, never assigned directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub full_name: String,
    pub balance_cents: i64,
    /// Soft delete flag.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the wallet balance as Money.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// A physical loyalty card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Card {
    pub id: String,
    /// Hardware identifier read at scan time. Unique.
    pub uid: String,
    /// Unlinked cards exist (printed but not yet assigned).
    pub customer_id: Option<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Whether the card's expiry has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if exp < now)
    }
}

/// An instant discount selectable by the operator at settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Discount {
    pub id: String,
    pub name: String,
    pub kind: RewardKind,
    /// Whole percent for `Percentage`, cents for `Fixed`.
    pub value: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A marketing campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub kind: CampaignKind,
    /// Trigger for `AutoSpend` campaigns.
    pub min_spend_cents: Option<i64>,
    /// Trigger for stamp-card bundles.
    pub target_count: Option<i64>,
    pub reward_kind: RewardKind,
    pub reward_value: i64,
    pub validity_days: i64,
    /// Purchase price for bundles; 0 marks a stamp card.
    pub price_cents: i64,
    /// Coupons granted per paid bundle purchase.
    pub usage_limit: i64,
    pub is_active: bool,
    /// Soft delete flag.
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// The reward this campaign's coupons apply at redemption.
    pub fn reward_config(&self) -> RewardConfig {
        RewardConfig {
            kind: self.reward_kind,
            value: self.reward_value,
            validity_days: self.validity_days,
        }
    }

    /// A bundle with a zero price is a stamp (punch) card.
    pub fn is_stamp_card(&self) -> bool {
        self.kind == CampaignKind::Bundle && self.price_cents == 0
    }

    /// A bundle with a positive price is a paid package.
    pub fn is_paid_bundle(&self) -> bool {
        self.kind == CampaignKind::Bundle && self.price_cents > 0
    }

    /// Campaign price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A per-customer redeemable instance of a campaign's reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CustomerCoupon {
    pub id: String,
    pub customer_id: String,
    pub campaign_id: String,
    /// 6-char base-36 display code. Not a key; collisions are harmless.
    pub code: String,
    pub status: CouponStatus,
    pub source: CouponSource,
    /// The settlement that granted this coupon, when one did.
    pub transaction_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CustomerCoupon {
    /// Whether the coupon's expiry has passed at `now`.
    ///
    /// Note the row may still read `Active`; expiry is detected lazily and
    /// persisted at redemption or listing time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Punch-card accumulator. One row per (customer, campaign), lazily created,
/// reset to 0 (never deleted) on reward grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CampaignProgress {
    pub id: String,
    pub customer_id: String,
    pub campaign_id: String,
    pub current_count: i64,
    pub target_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// An immutable settlement record. Append-only; never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub customer_id: String,
    pub card_id: String,
    pub discount_id: Option<String>,
    pub coupon_id: Option<String>,
    pub amount_before_cents: i64,
    pub amount_after_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Final charge as Money.
    #[inline]
    pub fn amount_after(&self) -> Money {
        Money::from_cents(self.amount_after_cents)
    }
}

/// A signed wallet movement. Source of truth for customer balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WalletLedgerEntry {
    pub id: String,
    pub customer_id: String,
    /// Signed: deposits positive, withdrawals negative.
    pub amount_cents: i64,
    pub kind: MovementKind,
    pub reason: String,
    pub transaction_id: Option<String>,
    pub admin_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A queued campaign evaluation, keyed by the settled transaction.
///
/// Enqueued in the same SQL transaction as the [`Transaction`] insert, so a
/// committed charge always has exactly one evaluation row. The UNIQUE
/// transaction_id plus a conditional pending→done claim make evaluation
/// retryable without double-granting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RewardOutboxEntry {
    pub id: String,
    pub transaction_id: String,
    /// Explicit bundle purchase, when the operator selected one.
    pub campaign_id: Option<String>,
    pub status: OutboxStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A physical point-of-sale terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Terminal {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    /// argon2 hash of the shared secret. Never the secret itself.
    pub secret_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Display DTOs
// =============================================================================

/// A reward granted during settlement, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedReward {
    /// Campaign name.
    pub name: String,
    /// How the reward applies when redeemed.
    pub kind: RewardKind,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_transitions_one_way() {
        use CouponStatus::*;

        assert!(Active.can_transition_to(Used));
        assert!(Active.can_transition_to(Expired));
        assert!(Active.can_transition_to(Voided));

        // Terminal states never revert.
        for terminal in [Used, Expired, Voided] {
            for to in [Active, Used, Expired, Voided] {
                assert!(!terminal.can_transition_to(to));
            }
        }
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_campaign_classification() {
        let mut campaign = Campaign {
            id: "c1".into(),
            name: "Coffee card".into(),
            kind: CampaignKind::Bundle,
            min_spend_cents: None,
            target_count: Some(10),
            reward_kind: RewardKind::Percentage,
            reward_value: 100,
            validity_days: 30,
            price_cents: 0,
            usage_limit: 1,
            is_active: true,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(campaign.is_stamp_card());
        assert!(!campaign.is_paid_bundle());

        campaign.price_cents = 2500;
        assert!(!campaign.is_stamp_card());
        assert!(campaign.is_paid_bundle());

        campaign.kind = CampaignKind::AutoSpend;
        assert!(!campaign.is_stamp_card());
        assert!(!campaign.is_paid_bundle());
    }

    #[test]
    fn test_card_expiry() {
        let now = Utc::now();
        let card = Card {
            id: "card1".into(),
            uid: "04A1B2C3".into(),
            customer_id: Some("cust1".into()),
            is_active: true,
            expires_at: Some(now - chrono::Duration::days(1)),
            created_at: now,
        };
        assert!(card.is_expired_at(now));

        let no_expiry = Card {
            expires_at: None,
            ..card
        };
        assert!(!no_expiry.is_expired_at(now));
    }
}
