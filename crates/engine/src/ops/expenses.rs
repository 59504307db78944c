//! Expense creation and the two-step settlement.
//!
//! Borrowers pay their own share first ([`Engine::pay_share`]); once nobody
//! owes anything the lender closes the expense ([`Engine::settle_expense`]).
//! Only closed expenses can be deleted.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Account, EngineError, Expense, ExpenseNewCmd, MoneyCents, PayShareCmd, ResultEngine,
    accounts, expenses, user_expenses,
};

use super::{Engine, with_tx};

impl Engine {
    /// Create an expense paid by `cmd.lender_id` and split evenly between
    /// `cmd.split_with`.
    ///
    /// Nothing is written unless the lender and every borrower are members of
    /// the room.
    pub async fn create_expense(&self, cmd: ExpenseNewCmd) -> ResultEngine<Expense> {
        let expense = Expense::new(
            cmd.room_id,
            &cmd.name,
            cmd.description.as_deref(),
            cmd.amount_minor,
        )?;
        validate_borrowers(cmd.lender_id, &cmd.split_with)?;

        with_tx!(self, |db_tx| {
            self.require_room(&db_tx, cmd.room_id).await?;
            if !self.is_member(&db_tx, cmd.room_id, cmd.lender_id).await? {
                return Err(EngineError::KeyNotFound(
                    "expense creator not part of the room".to_string(),
                ));
            }
            for &borrower in &cmd.split_with {
                if !self.is_member(&db_tx, cmd.room_id, borrower).await? {
                    return Err(EngineError::KeyNotFound(
                        "expense borrowers not part of the room".to_string(),
                    ));
                }
            }

            let rows = expense.share_rows(cmd.lender_id, &cmd.split_with)?;
            let expense_model: expenses::ActiveModel = (&expense).into();
            let expense_model = expense_model.insert(&db_tx).await?;
            user_expenses::Entity::insert_many(rows)
                .exec_without_returning(&db_tx)
                .await?;

            tracing::info!(
                "expense {} ({}) created in room {} by {}",
                expense.id,
                MoneyCents::new(expense.amount_minor),
                cmd.room_id,
                cmd.lender_id
            );
            self.load_expense(&db_tx, expense_model).await
        })
    }

    /// Return an expense of a room the caller belongs to.
    pub async fn expense(
        &self,
        room_id: Uuid,
        expense_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, room_id, user_id).await?;
            let model = expenses::Entity::find_by_id(expense_id.to_string())
                .filter(expenses::Column::RoomId.eq(room_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
            self.load_expense(&db_tx, model).await
        })
    }

    /// All expenses of a room, newest first.
    pub async fn room_expenses(&self, room_id: Uuid, user_id: Uuid) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, room_id, user_id).await?;
            let models = expenses::Entity::find()
                .filter(expenses::Column::RoomId.eq(room_id.to_string()))
                .order_by_desc(expenses::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                out.push(self.load_expense(&db_tx, model).await?);
            }
            Ok(out)
        })
    }

    /// A borrower pays their share from one of their accounts.
    ///
    /// The amount must match the owed share exactly; the account is debited
    /// and the share marked settled in the same transaction.
    pub async fn pay_share(&self, cmd: PayShareCmd) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let expense_model = expenses::Entity::find_by_id(cmd.expense_id.to_string())
                .filter(expenses::Column::RoomId.eq(cmd.room_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
            if expense_model.is_settled {
                return Err(EngineError::Conflict("expense already settled".to_string()));
            }

            let share = user_expenses::Entity::find_by_id((
                cmd.user_id.to_string(),
                cmd.expense_id.to_string(),
            ))
            .one(&db_tx)
            .await?
            .filter(|share| !share.is_lender)
            .ok_or_else(|| {
                EngineError::KeyNotFound("user is not a borrower of this expense".to_string())
            })?;
            if share.is_settled {
                return Err(EngineError::Conflict("share already settled".to_string()));
            }

            let account_model = accounts::Entity::find_by_id(cmd.account_id.to_string())
                .filter(accounts::Column::UserId.eq(cmd.user_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;

            let owed = MoneyCents::new(share.amount_owed_minor);
            if cmd.amount_minor != owed.cents() {
                return Err(EngineError::InvalidInput(format!(
                    "amount must equal the owed share ({owed})"
                )));
            }

            let mut account = Account::try_from(account_model)?;
            account.debit(owed)?;
            accounts::ActiveModel {
                id: ActiveValue::Set(account.id.to_string()),
                balance_minor: ActiveValue::Set(account.balance_minor),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            user_expenses::ActiveModel {
                user_id: ActiveValue::Set(share.user_id),
                expense_id: ActiveValue::Set(share.expense_id),
                is_settled: ActiveValue::Set(true),
                settled_at: ActiveValue::Set(Some(Utc::now())),
                paid_from_account_id: ActiveValue::Set(Some(account.id.to_string())),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            tracing::info!(
                "user {} paid {owed} on expense {} from account {}",
                cmd.user_id,
                cmd.expense_id,
                account.id
            );
            self.load_expense(&db_tx, expense_model).await
        })
    }

    /// The lender closes the expense once every borrower has paid.
    pub async fn settle_expense(&self, expense_id: Uuid, user_id: Uuid) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let model = self.require_expense(&db_tx, expense_id).await?;
            let expense = self.load_expense(&db_tx, model).await?;
            if !expense.is_lender(user_id) {
                return Err(EngineError::Forbidden(
                    "only the lender can settle the expense".to_string(),
                ));
            }
            if expense.is_settled {
                return Err(EngineError::Conflict("expense already settled".to_string()));
            }
            if !expense.all_borrowers_settled() {
                return Err(EngineError::Conflict(
                    "not all borrowers have settled".to_string(),
                ));
            }

            let model = expenses::ActiveModel {
                id: ActiveValue::Set(expense_id.to_string()),
                is_settled: ActiveValue::Set(true),
                settled_at: ActiveValue::Set(Some(Utc::now())),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            tracing::info!("expense {expense_id} settled by {user_id}");
            self.load_expense(&db_tx, model).await
        })
    }

    /// Delete a settled expense and its shares. Lender only.
    pub async fn delete_expense(&self, expense_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_expense(&db_tx, expense_id).await?;
            let expense = self.load_expense(&db_tx, model).await?;
            if !expense.is_lender(user_id) {
                return Err(EngineError::Forbidden(
                    "only the lender can delete the expense".to_string(),
                ));
            }
            if !expense.is_settled {
                return Err(EngineError::Conflict(
                    "expense is not settled".to_string(),
                ));
            }

            user_expenses::Entity::delete_many()
                .filter(user_expenses::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(expense_id.to_string())
                .exec(&db_tx)
                .await?;
            tracing::info!("expense {expense_id} deleted by {user_id}");
            Ok(())
        })
    }
}

/// Borrowers must be distinct and must not include the lender.
fn validate_borrowers(lender_id: Uuid, split_with: &[Uuid]) -> ResultEngine<()> {
    if split_with.is_empty() {
        return Err(EngineError::InvalidInput(
            "split list must not be empty".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(split_with.len());
    for &borrower in split_with {
        if borrower == lender_id {
            return Err(EngineError::InvalidInput(
                "the lender cannot borrow from themselves".to_string(),
            ));
        }
        if !seen.insert(borrower) {
            return Err(EngineError::InvalidInput(format!(
                "duplicate borrower {borrower}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrowers_must_be_distinct() {
        let lender = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_borrowers(lender, &[b]).is_ok());
        assert!(validate_borrowers(lender, &[b, b]).is_err());
    }

    #[test]
    fn lender_cannot_be_a_borrower() {
        let lender = Uuid::new_v4();
        assert!(validate_borrowers(lender, &[Uuid::new_v4(), lender]).is_err());
        assert!(validate_borrowers(lender, &[]).is_err());
    }
}
