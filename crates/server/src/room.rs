//! Room API endpoints

use api_types::{
    events::RoomEvent,
    room::{RoomNew, RoomUsersAdd, RoomUsersAdded, RoomView, RoomsResponse},
    user::UsersResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Room, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user::user_view};

fn room_view(room: Room) -> RoomView {
    RoomView {
        id: room.id,
        name: room.name,
        created_by: room.created_by,
        created_at: room.created_at,
    }
}

fn rooms_response(rooms: Vec<Room>) -> RoomsResponse {
    RoomsResponse {
        rooms: rooms.into_iter().map(room_view).collect(),
    }
}

/// Handle requests for creating a new `Room`
pub async fn room_new(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<RoomNew>,
) -> Result<(StatusCode, Json<RoomView>), ServerError> {
    let room = state.engine.new_room(&payload.name, user.id).await?;

    state.publish(RoomEvent::RoomCreated {
        room_id: room.id,
        created_by: user.id,
    });
    Ok((StatusCode::CREATED, Json(room_view(room))))
}

pub async fn list(
    _: Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<RoomsResponse>, ServerError> {
    let rooms = state.engine.list_rooms().await?;
    Ok(Json(rooms_response(rooms)))
}

/// Rooms a given user belongs to.
pub async fn for_user(
    _: Extension<User>,
    State(state): State<ServerState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<RoomsResponse>, ServerError> {
    let rooms = state.engine.rooms_for_user(user_id).await?;
    Ok(Json(rooms_response(rooms)))
}

pub async fn get(
    _: Extension<User>,
    State(state): State<ServerState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomView>, ServerError> {
    let room = state.engine.room(room_id).await?;
    Ok(Json(room_view(room)))
}

pub async fn users(
    _: Extension<User>,
    State(state): State<ServerState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<UsersResponse>, ServerError> {
    let users = state.engine.room_users(room_id).await?;
    Ok(Json(UsersResponse {
        users: users.into_iter().map(user_view).collect(),
    }))
}

/// Add users to a room the caller belongs to.
pub async fn add_users(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<RoomUsersAdd>,
) -> Result<Json<RoomUsersAdded>, ServerError> {
    let added = state
        .engine
        .add_users_to_room(room_id, &payload.user_ids, user.id)
        .await?;

    if !added.is_empty() {
        state.publish(RoomEvent::UsersAdded {
            room_id,
            user_ids: added.clone(),
        });
    }
    Ok(Json(RoomUsersAdded {
        room_id,
        user_ids: added,
    }))
}

pub async fn remove(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(room_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_room(room_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
