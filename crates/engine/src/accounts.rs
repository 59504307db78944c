//! The module contains `Account` struct and its implementation.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, util::parse_uuid};

/// A payment source owned by a user (bank account, card, cash...).
///
/// Borrowers settle their expense shares by paying from one of their own
/// accounts; the balance can never go below zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub balance_minor: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: Uuid, name: String, balance_minor: i64) -> ResultEngine<Self> {
        if balance_minor < 0 {
            return Err(EngineError::InvalidInput(
                "balance must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            balance_minor,
            created_at: Utc::now(),
        })
    }

    /// Withdraw `amount` from the account.
    pub fn debit(&mut self, amount: MoneyCents) -> ResultEngine<()> {
        let remaining = MoneyCents::new(self.balance_minor)
            .checked_sub(amount)
            .filter(|left| left.cents() >= 0)
            .ok_or_else(|| {
                EngineError::InsufficientFunds(format!(
                    "account {} has {}, needs {amount}",
                    self.name,
                    MoneyCents::new(self.balance_minor)
                ))
            })?;
        self.balance_minor = remaining.cents();
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub balance_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            user_id: parse_uuid(&model.user_id, "user")?,
            name: model.name,
            balance_minor: model.balance_minor,
            created_at: model.created_at,
        })
    }
}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            balance_minor: ActiveValue::Set(value.balance_minor),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance_minor: i64) -> Account {
        Account::new(Uuid::new_v4(), "Checking".to_string(), balance_minor).unwrap()
    }

    #[test]
    fn debit_reduces_balance() {
        let mut acc = account(10_000);
        acc.debit(MoneyCents::new(2_500)).unwrap();
        assert_eq!(acc.balance_minor, 7_500);
    }

    #[test]
    fn debit_can_empty_the_account() {
        let mut acc = account(500);
        acc.debit(MoneyCents::new(500)).unwrap();
        assert_eq!(acc.balance_minor, 0);
    }

    #[test]
    fn debit_rejects_overdraft() {
        let mut acc = account(100);
        let err = acc.debit(MoneyCents::new(101)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds(_)));
        assert_eq!(acc.balance_minor, 100);
    }

    #[test]
    fn negative_opening_balance_is_rejected() {
        assert!(Account::new(Uuid::new_v4(), "X".to_string(), -1).is_err());
    }
}
