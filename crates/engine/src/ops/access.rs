use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, ResultEngine, Share, User, expenses, rooms, user_expenses, user_rooms,
    users, util::parse_uuid,
};

use super::Engine;

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn require_room(
        &self,
        db: &DatabaseTransaction,
        room_id: Uuid,
    ) -> ResultEngine<rooms::Model> {
        rooms::Entity::find_by_id(room_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("room not exists".to_string()))
    }

    pub(super) async fn is_member(
        &self,
        db: &DatabaseTransaction,
        room_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<bool> {
        user_rooms::Entity::find_by_id((user_id.to_string(), room_id.to_string()))
            .one(db)
            .await
            .map(|model| model.is_some())
            .map_err(Into::into)
    }

    /// Load the room and check `user_id` belongs to it.
    ///
    /// Non-members get the same `KeyNotFound` as a missing room, so room ids
    /// cannot be probed.
    pub(super) async fn require_member(
        &self,
        db: &DatabaseTransaction,
        room_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<rooms::Model> {
        let room = self.require_room(db, room_id).await?;
        if !self.is_member(db, room_id, user_id).await? {
            return Err(EngineError::KeyNotFound("room not exists".to_string()));
        }
        Ok(room)
    }

    pub(super) async fn require_expense(
        &self,
        db: &DatabaseTransaction,
        expense_id: Uuid,
    ) -> ResultEngine<expenses::Model> {
        expenses::Entity::find_by_id(expense_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))
    }

    /// Shares of an expense joined with their user; lender first, then
    /// borrowers by name.
    pub(super) async fn expense_shares(
        &self,
        db: &DatabaseTransaction,
        expense_id: &str,
    ) -> ResultEngine<Vec<Share>> {
        let rows = user_expenses::Entity::find()
            .filter(user_expenses::Column::ExpenseId.eq(expense_id.to_string()))
            .find_also_related(users::Entity)
            .all(db)
            .await?;

        let mut shares = Vec::with_capacity(rows.len());
        for (share, user) in rows {
            let user = User::try_from(
                user.ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?,
            )?;
            shares.push(Share {
                user_id: user.id,
                full_name: user.full_name(),
                email: user.email,
                is_lender: share.is_lender,
                amount_owed_minor: share.amount_owed_minor,
                is_settled: share.is_settled,
                settled_at: share.settled_at,
                paid_from_account_id: share
                    .paid_from_account_id
                    .as_deref()
                    .map(|id| parse_uuid(id, "account"))
                    .transpose()?,
            });
        }
        shares.sort_by(|a, b| {
            b.is_lender
                .cmp(&a.is_lender)
                .then_with(|| a.full_name.cmp(&b.full_name))
        });
        Ok(shares)
    }

    pub(super) async fn load_expense(
        &self,
        db: &DatabaseTransaction,
        model: expenses::Model,
    ) -> ResultEngine<Expense> {
        let shares = self.expense_shares(db, &model.id).await?;
        Expense::try_from((model, shares))
    }
}
