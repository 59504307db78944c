//! Users and bearer sessions.

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, SignUpCmd, User, sessions, users,
    util::{
        hash_password, hash_token, new_token, normalize_display, normalize_email,
        normalize_required, verify_password,
    },
};

use super::{Engine, SignedIn, with_tx};

impl Engine {
    /// Register a user, open a first session and join the default room.
    ///
    /// Fails with `ExistingKey` when the email is taken (case-insensitive).
    pub async fn sign_up(&self, cmd: SignUpCmd) -> ResultEngine<SignedIn> {
        let first_name = normalize_display(&normalize_required(&cmd.first_name, "first name")?);
        let last_name = normalize_display(&normalize_required(&cmd.last_name, "last name")?);
        let email = normalize_email(&cmd.email)?;
        if cmd.password.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }

        let password_hash = hash_password(&cmd.password)?;

        with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(email));
            }

            let user = User {
                id: Uuid::new_v4(),
                first_name,
                last_name,
                email,
                created_at: Utc::now(),
            };
            let mut user_model: users::ActiveModel = (&user).into();
            user_model.password_hash = ActiveValue::Set(password_hash);
            user_model.insert(&db_tx).await?;

            let token = self.open_session(&db_tx, user.id).await?;
            let default_room = match self.default_room.as_deref() {
                Some(name) => Some(self.join_room_by_name(&db_tx, name, user.id).await?),
                None => None,
            };

            tracing::info!("user {} signed up", user.id);
            Ok(SignedIn {
                user,
                token,
                default_room,
            })
        })
    }

    /// Check the credentials and open a new session.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn sign_in(&self, email: &str, password: &str) -> ResultEngine<SignedIn> {
        let invalid = || EngineError::Unauthorized("invalid email or password".to_string());
        let email = normalize_email(email).map_err(|_| invalid())?;

        with_tx!(self, |db_tx| {
            let model = users::Entity::find()
                .filter(users::Column::Email.eq(email))
                .one(&db_tx)
                .await?
                .ok_or_else(invalid)?;
            if !verify_password(password, &model.password_hash) {
                return Err(invalid());
            }

            let user = User::try_from(model)?;
            let token = self.open_session(&db_tx, user.id).await?;
            tracing::info!("user {} signed in", user.id);
            Ok(SignedIn {
                user,
                token,
                default_room: None,
            })
        })
    }

    /// Drop the session behind `token`. Unknown tokens are ignored.
    pub async fn sign_out(&self, token: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            sessions::Entity::delete_by_id(hash_token(token))
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let (_, user) = sessions::Entity::find_by_id(hash_token(token))
                .find_also_related(users::Entity)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::Unauthorized("invalid session".to_string()))?;
            let user = user
                .ok_or_else(|| EngineError::Unauthorized("invalid session".to_string()))?;
            User::try_from(user)
        })
    }

    /// Every registered user, by last then first name.
    pub async fn list_users(&self) -> ResultEngine<Vec<User>> {
        with_tx!(self, |db_tx| {
            let models = users::Entity::find()
                .order_by_asc(users::Column::LastName)
                .order_by_asc(users::Column::FirstName)
                .all(&db_tx)
                .await?;
            models.into_iter().map(User::try_from).collect()
        })
    }

    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            User::try_from(model)
        })
    }

    /// Look a user up by login email.
    pub async fn user_by_email(&self, email: &str) -> ResultEngine<User> {
        let email = normalize_email(email)?;
        with_tx!(self, |db_tx| {
            let model = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .ok_or(EngineError::KeyNotFound(email))?;
            User::try_from(model)
        })
    }

    async fn open_session(&self, db: &DatabaseTransaction, user_id: Uuid) -> ResultEngine<String> {
        let token = new_token();
        sessions::ActiveModel {
            token_hash: ActiveValue::Set(hash_token(&token)),
            user_id: ActiveValue::Set(user_id.to_string()),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db)
        .await?;
        Ok(token)
    }
}
