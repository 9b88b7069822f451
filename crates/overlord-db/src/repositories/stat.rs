//! PostgreSQL implementation of StatRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{instrument, warn};

use overlord_core::entities::{StatDelta, StatKind, UserStats};
use overlord_core::traits::{RepoResult, StatRepository};
use overlord_core::value_objects::Snowflake;

use crate::models::StatModel;

use super::error::map_db_error;
use super::event::apply_delta;

/// PostgreSQL implementation of StatRepository
#[derive(Clone)]
pub struct PgStatRepository {
    pool: PgPool,
}

impl PgStatRepository {
    /// Create a new PgStatRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatRepository for PgStatRepository {
    #[instrument(skip(self))]
    async fn get(&self, user_id: Snowflake, kind: StatKind) -> RepoResult<i64> {
        let value = sqlx::query_scalar::<_, i64>(
            "SELECT value FROM stats WHERE user_id = $1 AND kind = $2",
        )
        .bind(user_id.into_inner())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(value.unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn load(&self, user_id: Snowflake) -> RepoResult<UserStats> {
        let rows = sqlx::query_as::<_, StatModel>("SELECT kind, value FROM stats WHERE user_id = $1")
            .bind(user_id.into_inner())
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        let mut stats = UserStats::default();
        for row in rows {
            match row.kind.parse::<StatKind>() {
                Ok(kind) => stats.set(kind, row.value),
                Err(reason) => warn!(%user_id, %reason, "Skipping unknown stat row"),
            }
        }
        Ok(stats)
    }

    #[instrument(skip(self))]
    async fn set(&self, user_id: Snowflake, kind: StatKind, value: i64) -> RepoResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        apply_delta(&mut conn, user_id, StatDelta::Set(kind, value)).await
    }

    #[instrument(skip(self, values), fields(count = values.len()))]
    async fn set_many(&self, kind: StatKind, values: &[(Snowflake, i64)]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        for (user_id, value) in values {
            apply_delta(&mut tx, *user_id, StatDelta::Set(kind, *value)).await?;
        }
        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }
}
