//! # Transaction Repository
//!
//! Append-only settlement records. Rows are inserted inside the settlement
//! transaction and never updated afterwards.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use perk_core::Transaction;

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, customer_id, card_id, discount_id, coupon_id,
                   amount_before_cents, amount_after_cents,
                   payment_method, status, created_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Lists a customer's transactions, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, customer_id, card_id, discount_id, coupon_id,
                   amount_before_cents, amount_after_cents,
                   payment_method, status, created_at
            FROM transactions
            WHERE customer_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}

/// Inserts a transaction row inside an existing transaction.
pub async fn insert_in(conn: &mut SqliteConnection, transaction: &Transaction) -> DbResult<()> {
    debug!(
        id = %transaction.id,
        customer_id = %transaction.customer_id,
        amount_after = transaction.amount_after_cents,
        method = ?transaction.payment_method,
        "Inserting transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, customer_id, card_id, discount_id, coupon_id,
            amount_before_cents, amount_after_cents,
            payment_method, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.customer_id)
    .bind(&transaction.card_id)
    .bind(&transaction.discount_id)
    .bind(&transaction.coupon_id)
    .bind(transaction.amount_before_cents)
    .bind(transaction.amount_after_cents)
    .bind(transaction.payment_method)
    .bind(transaction.status)
    .bind(transaction.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
