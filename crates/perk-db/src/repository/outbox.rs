//! # Reward Outbox Repository
//!
//! Queued campaign evaluations, keyed by settled transaction.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Reward Outbox Implementation                           │
//! │                                                                         │
//! │  SETTLEMENT                                                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   SINGLE TRANSACTION                            │    │
//! │  │  1. INSERT INTO transactions ...                                │    │
//! │  │  2. UPDATE customers SET balance_cents = balance_cents - ?      │    │
//! │  │  3. INSERT OR IGNORE INTO reward_outbox (transaction_id, ...)   │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │ COMMIT ← charge and evaluation queue succeed or fail together   │
//! │       ▼                                                                 │
//! │  CAMPAIGN EVALUATION (inline, and retried by the worker)                │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   SINGLE TRANSACTION                            │    │
//! │  │  1. UPDATE reward_outbox SET status='done'                      │    │
//! │  │     WHERE transaction_id=? AND status='pending'                 │    │
//! │  │     └── zero rows? someone already evaluated → ROLLBACK         │    │
//! │  │  2. INSERT coupons / bump stamp counters                        │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                        │
//! │  • A committed charge always has exactly one evaluation row             │
//! │  • Retries can never double-grant (the claim is the gate)              │
//! │  • A failed evaluation stays pending: delayed, not lost                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use perk_core::{OutboxStatus, RewardOutboxEntry};

/// Repository for reward outbox operations.
#[derive(Debug, Clone)]
pub struct RewardOutboxRepository {
    pool: SqlitePool,
}

impl RewardOutboxRepository {
    /// Creates a new RewardOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RewardOutboxRepository { pool }
    }

    /// Gets the outbox entry for a transaction.
    pub async fn get_by_transaction(
        &self,
        transaction_id: &str,
    ) -> DbResult<Option<RewardOutboxEntry>> {
        let entry = sqlx::query_as::<_, RewardOutboxEntry>(
            r#"
            SELECT id, transaction_id, campaign_id, status, attempts,
                   last_error, created_at, processed_at
            FROM reward_outbox
            WHERE transaction_id = ?1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets pending entries, oldest first.
    pub async fn get_pending(&self, limit: i64) -> DbResult<Vec<RewardOutboxEntry>> {
        let entries = sqlx::query_as::<_, RewardOutboxEntry>(
            r#"
            SELECT id, transaction_id, campaign_id, status, attempts,
                   last_error, created_at, processed_at
            FROM reward_outbox
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Records an evaluation failure.
    ///
    /// Bumps the attempt counter and parks the entry as `failed` once
    /// `max_attempts` is reached; until then it stays `pending` for retry.
    pub async fn mark_failed(
        &self,
        transaction_id: &str,
        error: &str,
        max_attempts: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE reward_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                processed_at = ?3,
                status = CASE WHEN attempts + 1 >= ?4 THEN 'failed' ELSE 'pending' END
            WHERE transaction_id = ?1 AND status = 'pending'
            "#,
        )
        .bind(transaction_id)
        .bind(error)
        .bind(now)
        .bind(max_attempts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts entries still pending. For diagnostics and tests.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reward_outbox WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Enqueues an evaluation inside the settlement transaction.
///
/// `INSERT OR IGNORE` + the UNIQUE transaction_id mean a settlement retried
/// at a higher level still ends up with a single evaluation row.
pub async fn enqueue_in(
    conn: &mut SqliteConnection,
    transaction_id: &str,
    campaign_id: Option<&str>,
) -> DbResult<()> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    debug!(transaction_id = %transaction_id, "Enqueuing reward evaluation");

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO reward_outbox (
            id, transaction_id, campaign_id, status, attempts, last_error,
            created_at, processed_at
        ) VALUES (?1, ?2, ?3, 'pending', 0, NULL, ?4, NULL)
        "#,
    )
    .bind(&id)
    .bind(transaction_id)
    .bind(campaign_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Claims a pending entry inside the evaluation transaction.
///
/// Returns `false` when the entry was not pending (already evaluated, or
/// parked as failed); the caller must then roll back its grants.
pub async fn claim_in(conn: &mut SqliteConnection, transaction_id: &str) -> DbResult<bool> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE reward_outbox SET
            status = 'done',
            attempts = attempts + 1,
            processed_at = ?2
        WHERE transaction_id = ?1 AND status = 'pending'
        "#,
    )
    .bind(transaction_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
