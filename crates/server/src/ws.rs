//! Real-time room events over a websocket.
//!
//! Every connected client gets the events of the rooms it belongs to. The
//! only frame a client sends is `{"event":"joinDefaultRoom"}`.

use std::collections::HashSet;

use api_types::events::{ClientEvent, RoomEvent};
use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use engine::User;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::{ServerError, message_for_engine_error, server::ServerState};

pub async fn upgrade(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| session(socket, state, user))
}

async fn session(mut socket: WebSocket, state: ServerState, user: User) {
    let mut events = state.events.subscribe();
    let mut rooms: HashSet<Uuid> = match state.engine.rooms_for_user(user.id).await {
        Ok(rooms) => rooms.into_iter().map(|room| room.id).collect(),
        Err(err) => {
            tracing::error!("cannot load rooms for websocket client {}: {err}", user.id);
            return;
        }
    };
    tracing::debug!("websocket client {} connected", user.id);

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(err) = handle_frame(&state, &user, text.as_str()).await {
                        let reply = serde_json::json!({ "error": error_message(err) });
                        if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!("websocket client {} failed: {err}", user.id);
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(event) => {
                    track_membership(&mut rooms, &event, user.id);
                    if !rooms.contains(&event.room_id()) {
                        continue;
                    }
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(err) => {
                            tracing::error!("failed to encode room event: {err}");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("websocket client {} skipped {skipped} events", user.id);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    tracing::debug!("websocket client {} disconnected", user.id);
}

async fn handle_frame(state: &ServerState, user: &User, text: &str) -> Result<(), ServerError> {
    let frame: ClientEvent = serde_json::from_str(text)
        .map_err(|err| ServerError::Generic(format!("invalid frame: {err}")))?;
    match frame {
        ClientEvent::JoinDefaultRoom => {
            let Some(name) = state.engine.default_room_name() else {
                return Err(ServerError::Generic("no default room configured".to_string()));
            };
            let room = state.engine.join_default_room(user.id, name).await?;
            state.publish(RoomEvent::JoinDefaultRoom {
                room_id: room.id,
                user_id: user.id,
            });
        }
    }
    Ok(())
}

/// Keep the client's room set current as it joins rooms.
fn track_membership(rooms: &mut HashSet<Uuid>, event: &RoomEvent, me: Uuid) {
    match event {
        RoomEvent::JoinDefaultRoom { room_id, user_id } if *user_id == me => {
            rooms.insert(*room_id);
        }
        RoomEvent::RoomCreated {
            room_id,
            created_by,
        } if *created_by == me => {
            rooms.insert(*room_id);
        }
        RoomEvent::UsersAdded { room_id, user_ids } if user_ids.contains(&me) => {
            rooms.insert(*room_id);
        }
        _ => {}
    }
}

fn error_message(err: ServerError) -> String {
    match err {
        ServerError::Engine(err) => message_for_engine_error(err),
        ServerError::Generic(msg) => msg,
    }
}

#[cfg(test)]
mod tests {
    use engine::{Engine, EngineError, SignUpCmd};
    use migration::MigratorTrait;

    use super::*;

    async fn state(default_room: Option<&str>) -> ServerState {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let mut builder = Engine::builder().database(db);
        if let Some(name) = default_room {
            builder = builder.default_room(name);
        }
        ServerState::new(builder.build().await.unwrap())
    }

    async fn ann(state: &ServerState) -> User {
        state
            .engine
            .sign_up(SignUpCmd::new("Ann", "Lee", "ann@example.com", "correct horse"))
            .await
            .unwrap()
            .user
    }

    #[tokio::test]
    async fn join_frame_joins_default_room_and_publishes() {
        let state = state(Some("Lobby")).await;
        let user = ann(&state).await;
        let mut events = state.events.subscribe();

        handle_frame(&state, &user, r#"{"event":"joinDefaultRoom"}"#)
            .await
            .unwrap();

        let rooms = state.engine.rooms_for_user(user.id).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].name, "Lobby");
        assert_eq!(
            events.try_recv().unwrap(),
            RoomEvent::JoinDefaultRoom {
                room_id: rooms[0].id,
                user_id: user.id,
            }
        );
    }

    #[tokio::test]
    async fn join_frame_without_default_room_is_an_error() {
        let state = state(None).await;
        let user = ann(&state).await;
        let mut events = state.events.subscribe();

        let err = handle_frame(&state, &user, r#"{"event":"joinDefaultRoom"}"#)
            .await
            .unwrap_err();
        assert_eq!(error_message(err), "no default room configured");
        assert!(events.try_recv().is_err());
        assert!(state.engine.rooms_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_frames_are_rejected() {
        let state = state(Some("Lobby")).await;
        let user = ann(&state).await;

        let err = handle_frame(&state, &user, r#"{"event":"shout"}"#)
            .await
            .unwrap_err();
        assert!(error_message(err).starts_with("invalid frame"));
    }

    #[test]
    fn database_errors_are_hidden_from_clients() {
        let err = ServerError::Engine(EngineError::Database(sea_orm::DbErr::Custom(
            "disk on fire".to_string(),
        )));
        assert_eq!(error_message(err), "internal server error");
        let err = ServerError::Engine(EngineError::Forbidden("nope".to_string()));
        assert_eq!(error_message(err), "Forbidden: nope");
    }

    #[test]
    fn membership_follows_join_and_add_events() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let (lobby, flat, trip) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut rooms = HashSet::new();

        track_membership(
            &mut rooms,
            &RoomEvent::JoinDefaultRoom {
                room_id: lobby,
                user_id: me,
            },
            me,
        );
        track_membership(
            &mut rooms,
            &RoomEvent::UsersAdded {
                room_id: flat,
                user_ids: vec![other, me],
            },
            me,
        );
        track_membership(
            &mut rooms,
            &RoomEvent::UsersAdded {
                room_id: trip,
                user_ids: vec![other],
            },
            me,
        );

        assert!(rooms.contains(&lobby));
        assert!(rooms.contains(&flat));
        assert!(!rooms.contains(&trip));
    }

    #[test]
    fn membership_follows_own_room_creation() {
        let me = Uuid::new_v4();
        let (mine, theirs) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rooms = HashSet::new();

        track_membership(
            &mut rooms,
            &RoomEvent::RoomCreated {
                room_id: mine,
                created_by: me,
            },
            me,
        );
        track_membership(
            &mut rooms,
            &RoomEvent::RoomCreated {
                room_id: theirs,
                created_by: Uuid::new_v4(),
            },
            me,
        );

        assert!(rooms.contains(&mine));
        assert!(!rooms.contains(&theirs));
    }
}
