//! Stat database model

use sqlx::FromRow;

/// Database model for stats table
#[derive(Debug, Clone, FromRow)]
pub struct StatModel {
    pub kind: String,
    pub value: i64,
}
