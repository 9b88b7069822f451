//! PostgreSQL implementation of EventRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use overlord_core::entities::{Event, EventRecord, NewEvent, StatDelta};
use overlord_core::traits::{EventRepository, RepoResult};
use overlord_core::value_objects::Snowflake;

use crate::mappers::EventInsert;
use crate::models::EventModel;

use super::error::{event_not_found, map_db_error};

/// PostgreSQL implementation of EventRepository
#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Create a new PgEventRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_event(conn: &mut PgConnection, event: &NewEvent) -> RepoResult<Event> {
    let row = EventInsert::new(event);
    let model = sqlx::query_as::<_, EventModel>(
        r"
        INSERT INTO events (kind, user_id, message_id, channel_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, kind, user_id, message_id, channel_id, consumed, created_at
        ",
    )
    .bind(row.kind)
    .bind(row.user_id)
    .bind(row.message_id)
    .bind(row.channel_id)
    .bind(event.created_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)?;

    Event::try_from(model)
}

/// Apply a stat delta inside an open transaction
pub(crate) async fn apply_delta(
    conn: &mut PgConnection,
    user_id: Snowflake,
    delta: StatDelta,
) -> RepoResult<()> {
    let (sql, kind, value) = match delta {
        StatDelta::Add(kind, amount) => (
            r"
            INSERT INTO stats (user_id, kind, value) VALUES ($1, $2, $3)
            ON CONFLICT (user_id, kind) DO UPDATE SET value = stats.value + EXCLUDED.value
            ",
            kind,
            amount,
        ),
        StatDelta::Set(kind, value) => (
            r"
            INSERT INTO stats (user_id, kind, value) VALUES ($1, $2, $3)
            ON CONFLICT (user_id, kind) DO UPDATE SET value = EXCLUDED.value
            ",
            kind,
            value,
        ),
    };

    sqlx::query(sql)
        .bind(user_id.into_inner())
        .bind(kind.as_str())
        .bind(value)
        .execute(&mut *conn)
        .await
        .map_err(map_db_error)?;

    Ok(())
}

#[async_trait]
impl EventRepository for PgEventRepository {
    #[instrument(skip(self, event), fields(kind = %event.kind, user_id = %event.user_id))]
    async fn append(&self, event: &NewEvent) -> RepoResult<Event> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        insert_event(&mut conn, event).await
    }

    #[instrument(skip(self, record), fields(kind = %record.event.kind, user_id = %record.event.user_id))]
    async fn record(&self, record: &EventRecord) -> RepoResult<Event> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let event = insert_event(&mut tx, &record.event).await?;

        if let Some(join_id) = record.consumes {
            let result = sqlx::query("UPDATE events SET consumed = TRUE WHERE id = $1")
                .bind(join_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
            if result.rows_affected() == 0 {
                return Err(event_not_found(join_id));
            }
        }

        for delta in &record.deltas {
            apply_delta(&mut tx, record.event.user_id, *delta).await?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(event)
    }

    #[instrument(skip(self))]
    async fn last_member_event(&self, user_id: Snowflake) -> RepoResult<Option<Event>> {
        let result = sqlx::query_as::<_, EventModel>(
            r"
            SELECT id, kind, user_id, message_id, channel_id, consumed, created_at
            FROM events
            WHERE user_id = $1 AND kind IN ('member_join', 'member_leave')
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Event::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn last_voice_event(
        &self,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> RepoResult<Option<Event>> {
        let result = sqlx::query_as::<_, EventModel>(
            r"
            SELECT id, kind, user_id, message_id, channel_id, consumed, created_at
            FROM events
            WHERE user_id = $1 AND channel_id = $2 AND kind IN ('vc_join', 'vc_leave')
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(user_id.into_inner())
        .bind(channel_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Event::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_message(&self, message_id: Snowflake) -> RepoResult<Option<Event>> {
        let result = sqlx::query_as::<_, EventModel>(
            r"
            SELECT id, kind, user_id, message_id, channel_id, consumed, created_at
            FROM events
            WHERE message_id = $1 AND kind = 'message_new'
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .bind(message_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Event::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(event_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_created_at(&self, id: i64, at: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query("UPDATE events SET created_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(event_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn latest_joins(&self) -> RepoResult<Vec<(Snowflake, DateTime<Utc>)>> {
        let rows = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r"
            SELECT DISTINCT ON (e.user_id) e.user_id, e.created_at
            FROM events e
            JOIN users u ON u.id = e.user_id
            WHERE e.kind = 'member_join' AND u.roles IS NOT NULL
            ORDER BY e.user_id, e.created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, at)| (Snowflake::new(id), at))
            .collect())
    }
}
