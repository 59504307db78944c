//! Bookkeeping engine for Splitroom.
//!
//! The engine owns the database schema (sea-orm entities) and every write
//! rule: room membership, expense splitting and the two-step settlement
//! (borrowers pay their share, then the lender closes the expense).

pub use accounts::Account;
pub use commands::{ExpenseNewCmd, PayShareCmd, SignUpCmd};
pub use error::EngineError;
pub use expenses::{Expense, Share};
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder, SignedIn};
pub use rooms::Room;
pub use users::User;

mod accounts;
mod commands;
mod error;
mod expenses;
mod money;
mod ops;
mod rooms;
mod sessions;
mod user_expenses;
mod user_rooms;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
