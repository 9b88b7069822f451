//! User entity <-> model mapper

use overlord_core::entities::User;
use overlord_core::error::DomainError;
use overlord_core::value_objects::{RoleMask, Snowflake};

use crate::models::UserModel;

/// Convert UserModel to User entity
impl TryFrom<UserModel> for User {
    type Error = DomainError;

    fn try_from(model: UserModel) -> Result<Self, Self::Error> {
        let roles = model
            .roles
            .map(|raw| {
                RoleMask::parse(&raw).ok_or_else(|| {
                    DomainError::DatabaseError(format!("corrupt role mask for user {}: {raw}", model.id))
                })
            })
            .transpose()?;

        Ok(User {
            id: Snowflake::new(model.id),
            name: model.name,
            discriminator: model.discriminator,
            display_name: model.display_name,
            roles,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Convert User entity reference to values for database insertion/update
pub struct UserInsert<'a> {
    pub id: i64,
    pub name: &'a str,
    pub discriminator: &'a str,
    pub display_name: Option<&'a str>,
    pub roles: Option<String>,
}

impl<'a> UserInsert<'a> {
    pub fn new(user: &'a User) -> Self {
        Self {
            id: user.id.into_inner(),
            name: &user.name,
            discriminator: &user.discriminator,
            display_name: user.display_name.as_deref(),
            roles: user.roles.as_ref().map(ToString::to_string),
        }
    }
}
