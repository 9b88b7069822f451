//! Event database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for events table
#[derive(Debug, Clone, FromRow)]
pub struct EventModel {
    pub id: i64,
    pub kind: String,
    pub user_id: i64,
    pub message_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}
