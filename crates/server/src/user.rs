//! User API endpoints

use api_types::user::{UserView, UsersResponse};
use axum::{Extension, Json, extract::State};
use engine::User;

use crate::{ServerError, server::ServerState};

pub(crate) fn user_view(user: User) -> UserView {
    UserView {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        created_at: user.created_at,
    }
}

/// List every registered user, so a room member can pick whom to add.
pub async fn list(
    _: Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<UsersResponse>, ServerError> {
    let users = state.engine.list_users().await?;
    Ok(Json(UsersResponse {
        users: users.into_iter().map(user_view).collect(),
    }))
}

pub async fn me(Extension(user): Extension<User>) -> Json<UserView> {
    Json(user_view(user))
}
