//! # Campaign Progress Repository
//!
//! Punch-card accumulators for stamp campaigns.
//!
//! The counter lives in SQL: the increment is an upsert with in-database
//! arithmetic, so two terminals stamping the same card concurrently can at
//! worst shift a reward by one scan - they can never corrupt the count.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use perk_core::CampaignProgress;

/// Repository for stamp-card progress operations.
#[derive(Debug, Clone)]
pub struct ProgressRepository {
    pool: SqlitePool,
}

impl ProgressRepository {
    /// Creates a new ProgressRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProgressRepository { pool }
    }

    /// Gets a customer's progress on a campaign, if any exists yet.
    pub async fn get(
        &self,
        customer_id: &str,
        campaign_id: &str,
    ) -> DbResult<Option<CampaignProgress>> {
        let progress = sqlx::query_as::<_, CampaignProgress>(
            r#"
            SELECT id, customer_id, campaign_id, current_count, target_count, updated_at
            FROM campaign_progress
            WHERE customer_id = ?1 AND campaign_id = ?2
            "#,
        )
        .bind(customer_id)
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(progress)
    }
}

/// Increments a stamp counter, creating the row on first occurrence.
///
/// Returns the count after the increment. The row is never deleted; on
/// reward grant the caller resets it with [`reset_in`].
pub async fn increment_in(
    conn: &mut SqliteConnection,
    customer_id: &str,
    campaign_id: &str,
    target_count: i64,
) -> DbResult<i64> {
    let now = Utc::now();
    let id = Uuid::new_v4().to_string();

    let count: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO campaign_progress (
            id, customer_id, campaign_id, current_count, target_count, updated_at
        ) VALUES (?1, ?2, ?3, 1, ?4, ?5)
        ON CONFLICT (customer_id, campaign_id) DO UPDATE SET
            current_count = current_count + 1,
            updated_at = excluded.updated_at
        RETURNING current_count
        "#,
    )
    .bind(&id)
    .bind(customer_id)
    .bind(campaign_id)
    .bind(target_count)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    debug!(
        customer_id = %customer_id,
        campaign_id = %campaign_id,
        count,
        "Stamp progress incremented"
    );

    Ok(count)
}

/// Resets a stamp counter to zero after a reward grant.
pub async fn reset_in(
    conn: &mut SqliteConnection,
    customer_id: &str,
    campaign_id: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE campaign_progress SET current_count = 0, updated_at = ?3
        WHERE customer_id = ?1 AND campaign_id = ?2
        "#,
    )
    .bind(customer_id)
    .bind(campaign_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
