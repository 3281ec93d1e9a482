//! # Card Lookup
//!
//! Resolves a scanned card uid to the customer behind it.
//!
//! ## Lookup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  uid ──► card exists? ──► card active? ──► card expired? ──► linked?    │
//! │            │ no             │ no             │ yes            │ no      │
//! │            ▼                ▼                ▼                ▼         │
//! │         NotFound       InvalidState       Expired          NotFound     │
//! │                                                                         │
//! │  ──► customer active? ──► CardProfile { card, customer, coupons }       │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │     NotFound                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use perk_core::{Card, Customer, Money};
use perk_db::repository::coupon::ActiveCoupon;
use perk_db::Database;

/// Everything the operator console shows after a scan.
#[derive(Debug, Clone, Serialize)]
pub struct CardProfile {
    pub card: Card,
    pub customer: Customer,
    pub balance: Money,
    pub active_coupons: Vec<ActiveCoupon>,
}

/// Resolves card uids to customer profiles.
#[derive(Debug, Clone)]
pub struct LookupService {
    db: Database,
}

impl LookupService {
    /// Creates a new LookupService.
    pub fn new(db: Database) -> Self {
        LookupService { db }
    }

    /// Looks up the customer profile behind a card uid.
    pub async fn by_uid(&self, uid: &str) -> EngineResult<CardProfile> {
        let card = self
            .db
            .customers()
            .get_card_by_uid(uid)
            .await?
            .ok_or_else(|| EngineError::not_found("Card", uid))?;

        if !card.is_active {
            return Err(EngineError::invalid_state("Card", uid, "inactive"));
        }
        if card.is_expired_at(Utc::now()) {
            return Err(EngineError::expired("Card", uid));
        }

        let customer_id = card
            .customer_id
            .as_deref()
            .ok_or_else(|| EngineError::not_found("Customer", uid))?;

        let customer = self
            .db
            .customers()
            .get_by_id(customer_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| EngineError::not_found("Customer", customer_id))?;

        let active_coupons = self.db.coupons().list_active(&customer.id).await?;

        debug!(
            uid = %uid,
            customer_id = %customer.id,
            coupons = active_coupons.len(),
            "Card lookup resolved"
        );

        Ok(CardProfile {
            balance: customer.balance(),
            card,
            customer,
            active_coupons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::Duration;
    use perk_db::DbConfig;

    async fn memory_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_unknown_uid_is_not_found() {
        let db = memory_db().await;
        let lookup = LookupService::new(db);

        let err = lookup.by_uid("missing").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_unlinked_card_is_not_found() {
        let db = memory_db().await;
        db.customers().create_card("04AA", None, None).await.unwrap();

        let err = LookupService::new(db).by_uid("04AA").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_expired_card() {
        let db = memory_db().await;
        let customer = db.customers().create("Test").await.unwrap();
        db.customers()
            .create_card(
                "04BB",
                Some(&customer.id),
                Some(Utc::now() - Duration::days(1)),
            )
            .await
            .unwrap();

        let err = LookupService::new(db).by_uid("04BB").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Expired);
    }

    #[tokio::test]
    async fn test_resolves_linked_card() {
        let db = memory_db().await;
        let customer = db.customers().create("Amira Khan").await.unwrap();
        db.customers()
            .create_card("04CC", Some(&customer.id), None)
            .await
            .unwrap();

        let profile = LookupService::new(db).by_uid("04CC").await.unwrap();
        assert_eq!(profile.customer.id, customer.id);
        assert_eq!(profile.balance, Money::zero());
        assert!(profile.active_coupons.is_empty());
    }
}
