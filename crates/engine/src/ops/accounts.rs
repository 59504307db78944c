use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    Account, EngineError, ResultEngine, accounts,
    util::{normalize_display, normalize_required},
};

use super::{Engine, with_tx};

impl Engine {
    /// Open a payment account for `user_id`.
    ///
    /// Names are unique per user, compared case-insensitively.
    pub async fn new_account(
        &self,
        user_id: Uuid,
        name: &str,
        balance_minor: i64,
    ) -> ResultEngine<Account> {
        let name = normalize_display(&normalize_required(name, "account name")?);
        let account = Account::new(user_id, name, balance_minor)?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let exists = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id.to_string()))
                .filter(Expr::cust("LOWER(name)").eq(account.name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey("account already exists".to_string()));
            }

            let model: accounts::ActiveModel = (&account).into();
            model.insert(&db_tx).await?;
            tracing::info!("account {} opened for {user_id}", account.id);
            Ok(account)
        })
    }

    pub async fn accounts_for_user(&self, user_id: Uuid) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id.to_string()))
                .order_by_asc(accounts::Column::Name)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Account::try_from).collect()
        })
    }

    /// Return one of the caller's accounts. Other users' accounts are
    /// reported as missing.
    pub async fn account(&self, account_id: Uuid, user_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = accounts::Entity::find_by_id(account_id.to_string())
                .filter(accounts::Column::UserId.eq(user_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            Account::try_from(model)
        })
    }
}
