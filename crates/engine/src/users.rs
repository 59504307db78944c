//! Users table.
//!
//! A user is identified by a stable UUID; the email is the login name and is
//! stored lowercase. Passwords are never stored: only an argon2id PHC string.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{ResultEngine, util::parse_uuid};

/// A registered user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// `"First Last"`, as shown next to expense shares.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_rooms::Entity")]
    UserRooms,
    #[sea_orm(has_many = "super::accounts::Entity")]
    Accounts,
}

impl Related<super::user_rooms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRooms.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = crate::EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "user")?,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            created_at: model.created_at,
        })
    }
}

impl From<&User> for ActiveModel {
    fn from(value: &User) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            first_name: ActiveValue::Set(value.first_name.clone()),
            last_name: ActiveValue::Set(value.last_name.clone()),
            email: ActiveValue::Set(value.email.clone()),
            password_hash: ActiveValue::NotSet,
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}
