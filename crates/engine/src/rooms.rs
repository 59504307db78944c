//! The `Room` groups users who share expenses.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{normalize_display, normalize_key, normalize_required, parse_uuid},
};

/// A named group of users.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(name: &str, created_by: Uuid) -> ResultEngine<Self> {
        let name = normalize_display(&normalize_required(name, "room name")?);
        if normalize_key(&name).is_empty() {
            return Err(EngineError::InvalidInput(
                "room name must contain a letter or digit".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            created_by,
            created_at: Utc::now(),
        })
    }

    /// Key used to detect duplicate room names.
    pub fn name_key(&self) -> String {
        normalize_key(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub name_key: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_rooms::Entity")]
    UserRooms,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::user_rooms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRooms.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Room {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "room")?,
            name: model.name,
            created_by: parse_uuid(&model.created_by, "user")?,
            created_at: model.created_at,
        })
    }
}

impl From<&Room> for ActiveModel {
    fn from(value: &Room) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            name_key: ActiveValue::Set(value.name_key()),
            created_by: ActiveValue::Set(value.created_by.to_string()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_room_normalizes_name() {
        let room = Room::new("  Flat   Mates ", Uuid::new_v4()).unwrap();
        assert_eq!(room.name, "Flat Mates");
        assert_eq!(room.name_key(), "flat mates");
    }

    #[test]
    fn new_room_rejects_blank_name() {
        assert!(Room::new("   ", Uuid::new_v4()).is_err());
    }

    #[test]
    fn new_room_rejects_punctuation_only_name() {
        assert!(matches!(
            Room::new("!!!", Uuid::new_v4()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(Room::new("#1", Uuid::new_v4()).is_ok());
    }
}
