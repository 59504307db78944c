use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tokio::sync::broadcast;

use std::sync::Arc;

use crate::{ServerError, account, auth, expense, room, user, ws};
use api_types::events::RoomEvent;
use engine::{Engine, EngineError};

/// Slots per websocket subscriber; slower clients skip ahead.
const EVENTS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub events: broadcast::Sender<RoomEvent>,
}

impl ServerState {
    pub fn new(engine: Engine) -> Self {
        let (events, _) = broadcast::channel(EVENTS_CAPACITY);
        Self {
            engine: Arc::new(engine),
            events,
        }
    }

    /// Publish to connected websocket clients. No subscribers is not an
    /// error.
    pub fn publish(&self, event: RoomEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("no websocket subscriber for room event");
        }
    }
}

/// Bearer token of the current request, kept for sign out.
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

async fn require_session(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(EngineError::Unauthorized("missing bearer token".to_string()).into());
    };

    let user = match state.engine.authenticate(bearer.token()).await {
        Ok(user) => user,
        Err(EngineError::Unauthorized(msg)) => {
            tracing::debug!("rejected bearer token: {msg}");
            return Err(EngineError::Unauthorized(msg).into());
        }
        Err(err) => return Err(err.into()),
    };

    request
        .extensions_mut()
        .insert(SessionToken(bearer.token().to_string()));
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Build the application router.
///
/// `/room/{id}` segments share one parameter name: it is a user id under
/// `/rooms` and a room id everywhere else.
pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/auth/session", delete(auth::sign_out))
        .route("/user", get(user::list))
        .route("/user/me", get(user::me))
        .route("/room", post(room::room_new).get(room::list))
        .route("/room/{id}/rooms", get(room::for_user))
        .route("/room/{id}", get(room::get).delete(room::remove))
        .route(
            "/room/{id}/users",
            get(room::users).post(room::add_users),
        )
        .route("/expense", post(expense::expense_new))
        .route("/expense/room/{room_id}", get(expense::list))
        .route(
            "/expense/room/{room_id}/expense/{expense_id}",
            get(expense::get).put(expense::pay_share),
        )
        .route("/expense/{expense_id}/settle", put(expense::settle))
        .route("/expense/{expense_id}", delete(expense::remove))
        .route("/account", post(account::account_new))
        .route("/account/user/{user_id}", get(account::for_user))
        .route("/ws", get(ws::upgrade))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .merge(protected)
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(ServerState::new(engine))).await
}
