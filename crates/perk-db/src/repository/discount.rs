//! # Discount Repository
//!
//! Instant discounts the operator can pick at settlement.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use perk_core::{Discount, RewardKind};

/// Repository for instant-discount database operations.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Gets a discount by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Discount>> {
        let discount = sqlx::query_as::<_, Discount>(
            r#"
            SELECT id, name, kind, value, is_active, created_at
            FROM discounts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(discount)
    }

    /// Creates a discount.
    pub async fn create(&self, name: &str, kind: RewardKind, value: i64) -> DbResult<Discount> {
        let discount = Discount {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind,
            value,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO discounts (id, name, kind, value, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(discount.kind)
        .bind(discount.value)
        .bind(discount.is_active)
        .bind(discount.created_at)
        .execute(&self.pool)
        .await?;

        Ok(discount)
    }
}
