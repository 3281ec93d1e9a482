//! # Terminal Repository
//!
//! Physical terminal records. The shared secret is stored as an argon2
//! hash; verification happens in the engine's ingestion service.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use perk_core::Terminal;

/// Repository for terminal database operations.
#[derive(Debug, Clone)]
pub struct TerminalRepository {
    pool: SqlitePool,
}

impl TerminalRepository {
    /// Creates a new TerminalRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TerminalRepository { pool }
    }

    /// Gets a terminal by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Terminal>> {
        let terminal = sqlx::query_as::<_, Terminal>(
            r#"
            SELECT id, branch_id, name, secret_hash, is_active, created_at
            FROM terminals
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(terminal)
    }

    /// Registers a terminal with an already-hashed secret.
    pub async fn create(
        &self,
        branch_id: &str,
        name: &str,
        secret_hash: &str,
    ) -> DbResult<Terminal> {
        let terminal = Terminal {
            id: Uuid::new_v4().to_string(),
            branch_id: branch_id.to_string(),
            name: name.to_string(),
            secret_hash: secret_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO terminals (id, branch_id, name, secret_hash, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&terminal.id)
        .bind(&terminal.branch_id)
        .bind(&terminal.name)
        .bind(&terminal.secret_hash)
        .bind(terminal.is_active)
        .bind(terminal.created_at)
        .execute(&self.pool)
        .await?;

        Ok(terminal)
    }
}
