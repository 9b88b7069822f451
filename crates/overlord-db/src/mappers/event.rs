//! Event entity <-> model mapper

use overlord_core::entities::{Event, EventKind, NewEvent};
use overlord_core::error::DomainError;
use overlord_core::value_objects::Snowflake;

use crate::models::EventModel;

/// Convert EventModel to Event entity
impl TryFrom<EventModel> for Event {
    type Error = DomainError;

    fn try_from(model: EventModel) -> Result<Self, Self::Error> {
        let kind = model
            .kind
            .parse::<EventKind>()
            .map_err(DomainError::DatabaseError)?;

        Ok(Event {
            id: model.id,
            kind,
            user_id: Snowflake::new(model.user_id),
            message_id: model.message_id.map(Snowflake::new),
            channel_id: model.channel_id.map(Snowflake::new),
            consumed: model.consumed,
            created_at: model.created_at,
        })
    }
}

/// Convert NewEvent reference to values for database insertion
pub struct EventInsert {
    pub kind: &'static str,
    pub user_id: i64,
    pub message_id: Option<i64>,
    pub channel_id: Option<i64>,
}

impl EventInsert {
    pub fn new(event: &NewEvent) -> Self {
        Self {
            kind: event.kind.as_str(),
            user_id: event.user_id.into_inner(),
            message_id: event.message_id.map(Snowflake::into_inner),
            channel_id: event.channel_id.map(Snowflake::into_inner),
        }
    }
}
