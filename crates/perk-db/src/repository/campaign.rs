//! # Campaign Repository
//!
//! Reads and writes for marketing campaigns.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use perk_core::{Campaign, CampaignKind, RewardKind};

const CAMPAIGN_COLUMNS: &str = r#"
    id, name, kind, min_spend_cents, target_count,
    reward_kind, reward_value, validity_days,
    price_cents, usage_limit, is_active, is_deleted,
    created_at, updated_at
"#;

/// Repository for campaign database operations.
#[derive(Debug, Clone)]
pub struct CampaignRepository {
    pool: SqlitePool,
}

impl CampaignRepository {
    /// Creates a new CampaignRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CampaignRepository { pool }
    }

    /// Gets a campaign by ID, excluding soft-deleted rows.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Campaign>> {
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1 AND is_deleted = 0"
        );
        let campaign = sqlx::query_as::<_, Campaign>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(campaign)
    }

    /// Lists active, non-deleted campaigns of a given kind.
    pub async fn list_active_by_kind(&self, kind: CampaignKind) -> DbResult<Vec<Campaign>> {
        let sql = format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS} FROM campaigns
            WHERE kind = ?1 AND is_active = 1 AND is_deleted = 0
            ORDER BY created_at, id
            "#
        );
        let campaigns = sqlx::query_as::<_, Campaign>(&sql)
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;

        Ok(campaigns)
    }

    /// Creates a campaign. Used by the admin surface and test fixtures.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        name: &str,
        kind: CampaignKind,
        min_spend_cents: Option<i64>,
        target_count: Option<i64>,
        reward_kind: RewardKind,
        reward_value: i64,
        validity_days: i64,
        price_cents: i64,
        usage_limit: i64,
    ) -> DbResult<Campaign> {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind,
            min_spend_cents,
            target_count,
            reward_kind,
            reward_value,
            validity_days,
            price_cents,
            usage_limit,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %campaign.id, name = %name, kind = ?kind, "Creating campaign");

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, name, kind, min_spend_cents, target_count,
                reward_kind, reward_value, validity_days,
                price_cents, usage_limit, is_active, is_deleted,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&campaign.id)
        .bind(&campaign.name)
        .bind(campaign.kind)
        .bind(campaign.min_spend_cents)
        .bind(campaign.target_count)
        .bind(campaign.reward_kind)
        .bind(campaign.reward_value)
        .bind(campaign.validity_days)
        .bind(campaign.price_cents)
        .bind(campaign.usage_limit)
        .bind(campaign.is_active)
        .bind(campaign.is_deleted)
        .bind(campaign.created_at)
        .bind(campaign.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(campaign)
    }

    /// Deactivates a campaign (stops it firing without deleting history).
    pub async fn deactivate(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE campaigns SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
