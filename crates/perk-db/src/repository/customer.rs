//! # Customer Repository
//!
//! Database operations for customers and their loyalty cards.
//!
//! Customer `balance_cents` is owned by the wallet repository; nothing here
//! writes it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use perk_core::{Card, Customer};

/// Repository for customer and card database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID. Includes soft-deleted rows; callers that need
    /// an active customer check `is_active`.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, full_name, balance_cents, is_active, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Creates a new customer with a zero balance.
    pub async fn create(&self, full_name: &str) -> DbResult<Customer> {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            balance_cents: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, full_name, balance_cents, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.full_name)
        .bind(customer.balance_cents)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a card by its hardware uid.
    pub async fn get_card_by_uid(&self, uid: &str) -> DbResult<Option<Card>> {
        let card = sqlx::query_as::<_, Card>(
            r#"
            SELECT id, uid, customer_id, is_active, expires_at, created_at
            FROM cards
            WHERE uid = ?1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    /// Gets a card by its primary key.
    pub async fn get_card_by_id(&self, id: &str) -> DbResult<Option<Card>> {
        let card = sqlx::query_as::<_, Card>(
            r#"
            SELECT id, uid, customer_id, is_active, expires_at, created_at
            FROM cards
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    /// Registers a card, optionally linked to a customer.
    pub async fn create_card(
        &self,
        uid: &str,
        customer_id: Option<&str>,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> DbResult<Card> {
        let card = Card {
            id: Uuid::new_v4().to_string(),
            uid: uid.to_string(),
            customer_id: customer_id.map(str::to_string),
            is_active: true,
            expires_at,
            created_at: Utc::now(),
        };

        debug!(id = %card.id, uid = %card.uid, "Registering card");

        sqlx::query(
            r#"
            INSERT INTO cards (id, uid, customer_id, is_active, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&card.id)
        .bind(&card.uid)
        .bind(&card.customer_id)
        .bind(card.is_active)
        .bind(card.expires_at)
        .bind(card.created_at)
        .execute(&self.pool)
        .await?;

        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::memory_db;

    #[tokio::test]
    async fn test_create_and_lookup_card() {
        let db = memory_db().await;

        let customer = db.customers().create("Amira Khan").await.unwrap();
        let card = db
            .customers()
            .create_card("04A1B2C3", Some(&customer.id), None)
            .await
            .unwrap();

        let found = db
            .customers()
            .get_card_by_uid("04A1B2C3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, card.id);
        assert_eq!(found.customer_id.as_deref(), Some(customer.id.as_str()));

        assert!(db
            .customers()
            .get_card_by_uid("missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_card_uid_rejected() {
        let db = memory_db().await;

        db.customers().create_card("DUP", None, None).await.unwrap();
        let err = db.customers().create_card("DUP", None, None).await;
        assert!(matches!(
            err,
            Err(crate::error::DbError::UniqueViolation { .. })
        ));
    }
}
