use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod auth {
    use super::*;
    use crate::user::UserView;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SignUp {
        pub first_name: String,
        pub last_name: String,
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SignIn {
        pub email: String,
        pub password: String,
    }

    /// Returned by sign up and sign in.
    ///
    /// `token` goes in the `Authorization: Bearer <token>` header of every
    /// other request.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthResponse {
        pub user: UserView,
        pub token: String,
    }
}

pub mod user {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub first_name: String,
        pub last_name: String,
        pub email: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UsersResponse {
        pub users: Vec<UserView>,
    }
}

pub mod room {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RoomNew {
        pub name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RoomView {
        pub id: Uuid,
        pub name: String,
        pub created_by: Uuid,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RoomsResponse {
        pub rooms: Vec<RoomView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RoomUsersAdd {
        pub user_ids: Vec<Uuid>,
    }

    /// Users actually added; members already in the room are left out.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RoomUsersAdded {
        pub room_id: Uuid,
        pub user_ids: Vec<Uuid>,
    }
}

pub mod expense {
    use super::*;

    /// Request body for creating an expense. The lender is the caller.
    ///
    /// Every field defaults so that a missing one is reported as a 400 by the
    /// handler instead of a body rejection.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub room_id: Option<Uuid>,
        #[serde(default)]
        pub name: String,
        pub description: Option<String>,
        /// Total in cents, must be > 0.
        #[serde(default)]
        pub amount_minor: i64,
        /// Borrowers; the amount is split evenly between them.
        #[serde(default)]
        pub split_with: Vec<Uuid>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ShareView {
        pub user_id: Uuid,
        pub full_name: String,
        pub email: String,
        pub is_lender: bool,
        pub amount_owed_minor: i64,
        pub is_settled: bool,
        pub settled_at: Option<DateTime<Utc>>,
        pub paid_from_account_id: Option<Uuid>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub room_id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub amount_minor: i64,
        pub is_settled: bool,
        pub created_at: DateTime<Utc>,
        pub settled_at: Option<DateTime<Utc>>,
        pub shares: Vec<ShareView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpensesResponse {
        pub expenses: Vec<ExpenseView>,
    }

    /// A borrower pays their share from one of their accounts.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SharePayment {
        pub account_id: Uuid,
        /// Must equal the owed share.
        pub amount_minor: i64,
    }
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        #[serde(default)]
        pub balance_minor: i64,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub user_id: Uuid,
        pub name: String,
        pub balance_minor: i64,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountsResponse {
        pub accounts: Vec<AccountView>,
    }
}

pub mod events {
    use super::*;

    /// Pushed to websocket clients as JSON text frames, tagged by `event`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "event", rename_all = "camelCase")]
    pub enum RoomEvent {
        JoinDefaultRoom {
            room_id: Uuid,
            user_id: Uuid,
        },
        RoomCreated {
            room_id: Uuid,
            created_by: Uuid,
        },
        UsersAdded {
            room_id: Uuid,
            user_ids: Vec<Uuid>,
        },
        ExpenseCreated {
            room_id: Uuid,
            expense_id: Uuid,
        },
        SharePaid {
            room_id: Uuid,
            expense_id: Uuid,
            user_id: Uuid,
        },
        ExpenseSettled {
            room_id: Uuid,
            expense_id: Uuid,
        },
    }

    impl RoomEvent {
        pub fn room_id(&self) -> Uuid {
            match self {
                Self::JoinDefaultRoom { room_id, .. }
                | Self::RoomCreated { room_id, .. }
                | Self::UsersAdded { room_id, .. }
                | Self::ExpenseCreated { room_id, .. }
                | Self::SharePaid { room_id, .. }
                | Self::ExpenseSettled { room_id, .. } => *room_id,
            }
        }
    }

    /// Frames a websocket client may send.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "event", rename_all = "camelCase")]
    pub enum ClientEvent {
        JoinDefaultRoom,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn events_are_tagged() {
            let room_id = Uuid::nil();
            let event = RoomEvent::ExpenseSettled {
                room_id,
                expense_id: room_id,
            };
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], "expenseSettled");
            assert_eq!(json["room_id"], room_id.to_string());

            let created = RoomEvent::RoomCreated {
                room_id,
                created_by: room_id,
            };
            assert_eq!(serde_json::to_value(&created).unwrap()["event"], "roomCreated");
            assert_eq!(created.room_id(), room_id);
        }

        #[test]
        fn client_join_frame_parses() {
            let event: ClientEvent = serde_json::from_str(r#"{"event":"joinDefaultRoom"}"#).unwrap();
            assert_eq!(event, ClientEvent::JoinDefaultRoom);
            assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"nope"}"#).is_err());
        }
    }
}
