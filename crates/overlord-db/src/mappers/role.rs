//! Role entity <-> model mapper

use overlord_core::entities::Role;
use overlord_core::value_objects::Snowflake;

use crate::models::RoleModel;

/// Convert RoleModel to Role entity
impl From<RoleModel> for Role {
    fn from(model: RoleModel) -> Self {
        Role {
            id: Snowflake::new(model.id),
            name: model.name,
            idx: model.idx,
            created_at: model.created_at,
        }
    }
}

/// Convert Role entity reference to values for database insertion
pub struct RoleInsert<'a> {
    pub id: i64,
    pub name: &'a str,
    pub idx: i32,
}

impl<'a> RoleInsert<'a> {
    pub fn new(role: &'a Role) -> Self {
        Self {
            id: role.id.into_inner(),
            name: &role.name,
            idx: role.idx,
        }
    }
}
