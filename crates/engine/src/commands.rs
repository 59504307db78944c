//! Command structs for engine operations.
//!
//! These types group parameters for the write operations that take more
//! than a couple of arguments (sign up, expense creation, share payment).

use uuid::Uuid;

/// Register a new user.
#[derive(Clone, Debug)]
pub struct SignUpCmd {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl SignUpCmd {
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Create an expense paid by `lender_id` and split between `split_with`.
#[derive(Clone, Debug)]
pub struct ExpenseNewCmd {
    pub room_id: Uuid,
    pub lender_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub split_with: Vec<Uuid>,
}

impl ExpenseNewCmd {
    #[must_use]
    pub fn new(
        room_id: Uuid,
        lender_id: Uuid,
        name: impl Into<String>,
        amount_minor: i64,
        split_with: Vec<Uuid>,
    ) -> Self {
        Self {
            room_id,
            lender_id,
            name: name.into(),
            description: None,
            amount_minor,
            split_with,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A borrower pays their share of an expense from one of their accounts.
#[derive(Clone, Debug)]
pub struct PayShareCmd {
    pub room_id: Uuid,
    pub expense_id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub amount_minor: i64,
}

impl PayShareCmd {
    #[must_use]
    pub fn new(
        room_id: Uuid,
        expense_id: Uuid,
        user_id: Uuid,
        account_id: Uuid,
        amount_minor: i64,
    ) -> Self {
        Self {
            room_id,
            expense_id,
            user_id,
            account_id,
            amount_minor,
        }
    }
}
