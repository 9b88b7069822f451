//! PostgreSQL implementation of RoleRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use overlord_core::entities::Role;
use overlord_core::traits::{RepoResult, RoleRepository, SyncSummary};

use crate::mappers::RoleInsert;
use crate::models::RoleModel;

use super::error::map_db_error;

/// PostgreSQL implementation of RoleRepository
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    /// Create a new PgRoleRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        let result = sqlx::query_as::<_, RoleModel>(
            r"
            SELECT id, name, idx, created_at
            FROM roles
            WHERE name = $1
            ORDER BY idx
            LIMIT 1
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Role::from))
    }

    #[instrument(skip(self))]
    async fn list(&self) -> RepoResult<Vec<Role>> {
        let results = sqlx::query_as::<_, RoleModel>(
            r"
            SELECT id, name, idx, created_at
            FROM roles
            ORDER BY idx
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Role::from).collect())
    }

    #[instrument(skip(self, roles), fields(count = roles.len()))]
    async fn sync_all(&self, roles: &[Role]) -> RepoResult<SyncSummary> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let mut summary = SyncSummary::default();

        for role in roles {
            let row = RoleInsert::new(role);
            // xmax is 0 only for freshly inserted tuples
            let inserted = sqlx::query_scalar::<_, bool>(
                r"
                INSERT INTO roles (id, name, idx, created_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, idx = EXCLUDED.idx
                RETURNING (xmax = 0)
                ",
            )
            .bind(row.id)
            .bind(row.name)
            .bind(row.idx)
            .bind(role.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

            if inserted {
                summary.inserted += 1;
            } else {
                summary.updated += 1;
            }
        }

        let keep: Vec<i64> = roles.iter().map(|r| r.id.into_inner()).collect();
        let removed = sqlx::query("DELETE FROM roles WHERE NOT (id = ANY($1))")
            .bind(&keep)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        summary.removed = removed.rows_affected();

        tx.commit().await.map_err(map_db_error)?;

        debug!(?summary, "Role table synced");
        Ok(summary)
    }
}
