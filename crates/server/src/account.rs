//! Account API endpoints

use api_types::account::{AccountNew, AccountView, AccountsResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Account, EngineError, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn account_view(account: Account) -> AccountView {
    AccountView {
        id: account.id,
        user_id: account.user_id,
        name: account.name,
        balance_minor: account.balance_minor,
        created_at: account.created_at,
    }
}

/// Open an account for the caller.
pub async fn account_new(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let account = state
        .engine
        .new_account(user.id, &payload.name, payload.balance_minor)
        .await?;
    Ok((StatusCode::CREATED, Json(account_view(account))))
}

/// List a user's accounts. Callers only see their own.
pub async fn for_user(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<AccountsResponse>, ServerError> {
    if user_id != user.id {
        return Err(EngineError::Forbidden("accounts of another user".to_string()).into());
    }
    let accounts = state.engine.accounts_for_user(user_id).await?;
    Ok(Json(AccountsResponse {
        accounts: accounts.into_iter().map(account_view).collect(),
    }))
}
