use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{ResultEngine, Room, User};

mod access;
mod accounts;
mod auth;
mod expenses;
mod rooms;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Outcome of a successful sign up or sign in.
///
/// `token` is the only copy of the bearer secret: the engine keeps its hash.
#[derive(Clone, Debug)]
pub struct SignedIn {
    pub user: User,
    pub token: String,
    /// Room the user was put in on sign up, if a default room is configured.
    pub default_room: Option<Room>,
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    default_room: Option<String>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Name of the room every new user joins, if any.
    pub fn default_room_name(&self) -> Option<&str> {
        self.default_room.as_deref()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    default_room: Option<String>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Room joined automatically on sign up. Blank names disable it.
    pub fn default_room(mut self, name: impl Into<String>) -> EngineBuilder {
        let name = name.into();
        self.default_room = Some(name).filter(|n| !n.trim().is_empty());
        self
    }

    /// Construct `Engine`. Fails if the default room name is not a valid
    /// room name.
    pub async fn build(self) -> ResultEngine<Engine> {
        if let Some(name) = self.default_room.as_deref() {
            Room::new(name, Uuid::nil())?;
        }
        Ok(Engine {
            database: self.database,
            default_room: self.default_room,
        })
    }
}
