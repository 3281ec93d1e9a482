//! # Wallet Ledger Repository
//!
//! Append-only signed-amount log per customer, plus the materialized
//! `customers.balance_cents`.
//!
//! ## Consistency Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TWO TERMINALS, ONE WALLET                                              │
//! │                                                                         │
//! │  The WRONG way (read-modify-write):                                     │
//! │    T1: SELECT balance → 50.00      T2: SELECT balance → 50.00           │
//! │    T1: UPDATE balance = 20.00      T2: UPDATE balance = 20.00           │
//! │    Both charged 30.00, balance only dropped once. Money invented.       │
//! │                                                                         │
//! │  The way it works here:                                                 │
//! │    UPDATE customers SET balance_cents = balance_cents - 3000            │
//! │    WHERE id = ? AND balance_cents >= 3000                               │
//! │    Zero rows affected ⇒ insufficient funds, roll back everything.       │
//! │                                                                         │
//! │  The ledger row and the balance update commit in ONE SQL transaction:   │
//! │  the balance is always the sum of the ledger.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use perk_core::{Money, MovementKind, WalletLedgerEntry};

/// Repository for wallet ledger operations.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    pool: SqlitePool,
}

impl WalletRepository {
    /// Creates a new WalletRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WalletRepository { pool }
    }

    /// Gets the current balance for an active customer.
    pub async fn balance(&self, customer_id: &str) -> DbResult<Money> {
        let cents: Option<i64> = sqlx::query_scalar(
            "SELECT balance_cents FROM customers WHERE id = ?1 AND is_active = 1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        cents
            .map(Money::from_cents)
            .ok_or_else(|| DbError::not_found("Customer", customer_id))
    }

    /// Appends a signed movement and applies it to the materialized balance.
    ///
    /// Both writes happen in one SQL transaction; the balance update is an
    /// in-SQL increment, so concurrent movements serialize correctly.
    pub async fn record_movement(
        &self,
        customer_id: &str,
        amount: Money,
        kind: MovementKind,
        reason: &str,
        transaction_id: Option<&str>,
        admin_id: Option<&str>,
    ) -> DbResult<WalletLedgerEntry> {
        let mut tx = self.pool.begin().await?;
        let entry = record_movement_in(
            &mut tx,
            customer_id,
            amount,
            kind,
            reason,
            transaction_id,
            admin_id,
        )
        .await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Lists ledger entries for a customer, oldest first.
    pub async fn entries(&self, customer_id: &str) -> DbResult<Vec<WalletLedgerEntry>> {
        let entries = sqlx::query_as::<_, WalletLedgerEntry>(
            r#"
            SELECT id, customer_id, amount_cents, kind, reason,
                   transaction_id, admin_id, created_at
            FROM wallet_ledger
            WHERE customer_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

/// Appends a movement inside an existing transaction.
///
/// Used directly by settlement so the WITHDRAWAL commits atomically with the
/// transaction row.
pub async fn record_movement_in(
    conn: &mut SqliteConnection,
    customer_id: &str,
    amount: Money,
    kind: MovementKind,
    reason: &str,
    transaction_id: Option<&str>,
    admin_id: Option<&str>,
) -> DbResult<WalletLedgerEntry> {
    let entry = WalletLedgerEntry {
        id: Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        amount_cents: amount.cents(),
        kind,
        reason: reason.to_string(),
        transaction_id: transaction_id.map(str::to_string),
        admin_id: admin_id.map(str::to_string),
        created_at: Utc::now(),
    };

    debug!(
        customer_id = %customer_id,
        amount = %amount,
        kind = ?kind,
        "Recording wallet movement"
    );

    sqlx::query(
        r#"
        INSERT INTO wallet_ledger (
            id, customer_id, amount_cents, kind, reason,
            transaction_id, admin_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.customer_id)
    .bind(entry.amount_cents)
    .bind(entry.kind)
    .bind(&entry.reason)
    .bind(&entry.transaction_id)
    .bind(&entry.admin_id)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE customers SET
            balance_cents = balance_cents + ?2,
            updated_at = ?3
        WHERE id = ?1 AND is_active = 1
        "#,
    )
    .bind(customer_id)
    .bind(entry.amount_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", customer_id));
    }

    Ok(entry)
}

/// Debits a wallet if and only if the balance covers `amount`.
///
/// Returns `false` when the conditional update matched no row (insufficient
/// funds or inactive customer) so the caller can roll back the enclosing
/// transaction without any side effects. On success the WITHDRAWAL ledger
/// row is appended in the same transaction, correlated by `transaction_id`.
pub async fn debit_if_sufficient_in(
    conn: &mut SqliteConnection,
    customer_id: &str,
    amount: Money,
    transaction_id: &str,
    admin_id: Option<&str>,
) -> DbResult<bool> {
    debug_assert!(amount.is_positive());

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE customers SET
            balance_cents = balance_cents - ?2,
            updated_at = ?3
        WHERE id = ?1 AND is_active = 1 AND balance_cents >= ?2
        "#,
    )
    .bind(customer_id)
    .bind(amount.cents())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        debug!(customer_id = %customer_id, amount = %amount, "Wallet debit refused");
        return Ok(false);
    }

    let entry = WalletLedgerEntry {
        id: Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        amount_cents: -amount.cents(),
        kind: MovementKind::Withdrawal,
        reason: "wallet_payment".to_string(),
        transaction_id: Some(transaction_id.to_string()),
        admin_id: admin_id.map(str::to_string),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO wallet_ledger (
            id, customer_id, amount_cents, kind, reason,
            transaction_id, admin_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.customer_id)
    .bind(entry.amount_cents)
    .bind(entry.kind)
    .bind(&entry.reason)
    .bind(&entry.transaction_id)
    .bind(&entry.admin_id)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(true)
}
