//! Sign up, sign in and sign out.

use api_types::{
    auth::{AuthResponse, SignIn, SignUp},
    events::RoomEvent,
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{SignUpCmd, SignedIn};

use crate::{
    ServerError,
    server::{ServerState, SessionToken},
    user::user_view,
};

fn auth_response(signed: SignedIn) -> AuthResponse {
    AuthResponse {
        user: user_view(signed.user),
        token: signed.token,
    }
}

/// Register a user. New users land in the default room when one is
/// configured, and its members are told about it.
pub async fn sign_up(
    State(state): State<ServerState>,
    Json(payload): Json<SignUp>,
) -> Result<(StatusCode, Json<AuthResponse>), ServerError> {
    let signed = state
        .engine
        .sign_up(SignUpCmd::new(
            payload.first_name,
            payload.last_name,
            payload.email,
            payload.password,
        ))
        .await?;

    if let Some(room) = &signed.default_room {
        state.publish(RoomEvent::JoinDefaultRoom {
            room_id: room.id,
            user_id: signed.user.id,
        });
    }
    Ok((StatusCode::CREATED, Json(auth_response(signed))))
}

pub async fn sign_in(
    State(state): State<ServerState>,
    Json(payload): Json<SignIn>,
) -> Result<Json<AuthResponse>, ServerError> {
    let signed = state
        .engine
        .sign_in(&payload.email, &payload.password)
        .await?;
    Ok(Json(auth_response(signed)))
}

pub async fn sign_out(
    Extension(token): Extension<SessionToken>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state.engine.sign_out(&token.0).await?;
    Ok(StatusCode::NO_CONTENT)
}
