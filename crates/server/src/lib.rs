use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, router, run_with_listener};

mod account;
mod auth;
mod expense;
mod room;
mod server;
mod user;
mod ws;

pub mod types {
    pub mod auth {
        pub use api_types::auth::{AuthResponse, SignIn, SignUp};
    }

    pub mod user {
        pub use api_types::user::{UserView, UsersResponse};
    }

    pub mod room {
        pub use api_types::room::{RoomNew, RoomUsersAdd, RoomUsersAdded, RoomView, RoomsResponse};
    }

    pub mod expense {
        pub use api_types::expense::{
            ExpenseNew, ExpenseView, ExpensesResponse, SharePayment, ShareView,
        };
    }

    pub mod account {
        pub use api_types::account::{AccountNew, AccountView, AccountsResponse};
    }

    pub mod events {
        pub use api_types::events::{ClientEvent, RoomEvent};
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::InsufficientFunds(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
