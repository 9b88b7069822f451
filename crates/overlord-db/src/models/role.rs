//! Role database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for roles table
#[derive(Debug, Clone, FromRow)]
pub struct RoleModel {
    pub id: i64,
    pub name: String,
    pub idx: i32,
    pub created_at: DateTime<Utc>,
}
