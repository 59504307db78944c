use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, JoinType, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Room, User, expenses, rooms, user_expenses, user_rooms, users,
};

use super::{Engine, with_tx};

impl Engine {
    /// Create a room owned by `user_id`, who becomes its first member.
    pub async fn new_room(&self, name: &str, user_id: Uuid) -> ResultEngine<Room> {
        let room = Room::new(name, user_id)?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            if self.find_room_by_key(&db_tx, &room.name_key()).await?.is_some() {
                return Err(EngineError::ExistingKey("room already exists".to_string()));
            }
            self.insert_room(&db_tx, &room).await?;
            tracing::info!("room {} created by {user_id}", room.id);
            Ok(room)
        })
    }

    pub async fn list_rooms(&self) -> ResultEngine<Vec<Room>> {
        with_tx!(self, |db_tx| {
            let models = rooms::Entity::find()
                .order_by_asc(rooms::Column::Name)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Room::try_from).collect()
        })
    }

    /// Rooms `user_id` belongs to, by name.
    pub async fn rooms_for_user(&self, user_id: Uuid) -> ResultEngine<Vec<Room>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let models = rooms::Entity::find()
                .join(JoinType::InnerJoin, rooms::Relation::UserRooms.def())
                .filter(user_rooms::Column::UserId.eq(user_id.to_string()))
                .order_by_asc(rooms::Column::Name)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Room::try_from).collect()
        })
    }

    pub async fn room(&self, room_id: Uuid) -> ResultEngine<Room> {
        with_tx!(self, |db_tx| {
            let model = self.require_room(&db_tx, room_id).await?;
            Room::try_from(model)
        })
    }

    /// Members of a room, by last then first name.
    pub async fn room_users(&self, room_id: Uuid) -> ResultEngine<Vec<User>> {
        with_tx!(self, |db_tx| {
            self.require_room(&db_tx, room_id).await?;
            let models = users::Entity::find()
                .join(JoinType::InnerJoin, users::Relation::UserRooms.def())
                .filter(user_rooms::Column::RoomId.eq(room_id.to_string()))
                .order_by_asc(users::Column::LastName)
                .order_by_asc(users::Column::FirstName)
                .all(&db_tx)
                .await?;
            models.into_iter().map(User::try_from).collect()
        })
    }

    /// Add `user_ids` to a room `actor_id` belongs to.
    ///
    /// Users already in the room are skipped; the returned ids are the ones
    /// actually added, in request order.
    pub async fn add_users_to_room(
        &self,
        room_id: Uuid,
        user_ids: &[Uuid],
        actor_id: Uuid,
    ) -> ResultEngine<Vec<Uuid>> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, room_id, actor_id).await?;
            if user_ids.is_empty() {
                return Err(EngineError::InvalidInput(
                    "user list must not be empty".to_string(),
                ));
            }

            let mut added = Vec::new();
            for &user_id in user_ids {
                self.require_user(&db_tx, user_id).await?;
                if added.contains(&user_id) || self.is_member(&db_tx, room_id, user_id).await? {
                    continue;
                }
                self.insert_membership(&db_tx, room_id, user_id).await?;
                added.push(user_id);
            }
            tracing::info!("{} users added to room {room_id}", added.len());
            Ok(added)
        })
    }

    /// Delete a room with its expenses, shares and memberships.
    ///
    /// Only the creator may delete it.
    pub async fn delete_room(&self, room_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let room = self.require_room(&db_tx, room_id).await?;
            if room.created_by != user_id.to_string() {
                return Err(EngineError::Forbidden(
                    "only the room creator can delete it".to_string(),
                ));
            }

            let expense_ids: Vec<String> = expenses::Entity::find()
                .select_only()
                .column(expenses::Column::Id)
                .filter(expenses::Column::RoomId.eq(room.id.clone()))
                .into_tuple()
                .all(&db_tx)
                .await?;
            if !expense_ids.is_empty() {
                user_expenses::Entity::delete_many()
                    .filter(user_expenses::Column::ExpenseId.is_in(expense_ids))
                    .exec(&db_tx)
                    .await?;
            }
            expenses::Entity::delete_many()
                .filter(expenses::Column::RoomId.eq(room.id.clone()))
                .exec(&db_tx)
                .await?;
            user_rooms::Entity::delete_many()
                .filter(user_rooms::Column::RoomId.eq(room.id.clone()))
                .exec(&db_tx)
                .await?;
            rooms::Entity::delete_by_id(room.id).exec(&db_tx).await?;

            tracing::info!("room {room_id} deleted by {user_id}");
            Ok(())
        })
    }

    /// Join the room called `room_name`, creating it on first use.
    pub async fn join_default_room(&self, user_id: Uuid, room_name: &str) -> ResultEngine<Room> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            self.join_room_by_name(&db_tx, room_name, user_id).await
        })
    }

    pub(super) async fn join_room_by_name(
        &self,
        db: &DatabaseTransaction,
        room_name: &str,
        user_id: Uuid,
    ) -> ResultEngine<Room> {
        let candidate = Room::new(room_name, user_id)?;
        let room = match self.find_room_by_key(db, &candidate.name_key()).await? {
            Some(model) => Room::try_from(model)?,
            None => {
                self.insert_room(db, &candidate).await?;
                return Ok(candidate);
            }
        };
        if !self.is_member(db, room.id, user_id).await? {
            self.insert_membership(db, room.id, user_id).await?;
        }
        Ok(room)
    }

    async fn find_room_by_key(
        &self,
        db: &DatabaseTransaction,
        name_key: &str,
    ) -> ResultEngine<Option<rooms::Model>> {
        rooms::Entity::find()
            .filter(rooms::Column::NameKey.eq(name_key.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Insert the room and its creator's membership.
    async fn insert_room(&self, db: &DatabaseTransaction, room: &Room) -> ResultEngine<()> {
        let room_model: rooms::ActiveModel = room.into();
        room_model.insert(db).await?;
        self.insert_membership(db, room.id, room.created_by).await
    }

    async fn insert_membership(
        &self,
        db: &DatabaseTransaction,
        room_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        user_rooms::ActiveModel {
            user_id: ActiveValue::Set(user_id.to_string()),
            room_id: ActiveValue::Set(room_id.to_string()),
            joined_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db)
        .await?;
        Ok(())
    }
}
