//! Expense API endpoints

use api_types::{
    events::RoomEvent,
    expense::{ExpenseNew, ExpenseView, ExpensesResponse, SharePayment, ShareView},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Expense, ExpenseNewCmd, PayShareCmd, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn expense_view(expense: Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        room_id: expense.room_id,
        name: expense.name,
        description: expense.description,
        amount_minor: expense.amount_minor,
        is_settled: expense.is_settled,
        created_at: expense.created_at,
        settled_at: expense.settled_at,
        shares: expense
            .shares
            .into_iter()
            .map(|share| ShareView {
                user_id: share.user_id,
                full_name: share.full_name,
                email: share.email,
                is_lender: share.is_lender,
                amount_owed_minor: share.amount_owed_minor,
                is_settled: share.is_settled,
                settled_at: share.settled_at,
                paid_from_account_id: share.paid_from_account_id,
            })
            .collect(),
    }
}

/// Create an expense lent by the caller.
pub async fn expense_new(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let Some(room_id) = payload.room_id else {
        return Err(ServerError::Generic("room_id required".to_string()));
    };

    let mut cmd = ExpenseNewCmd::new(
        room_id,
        user.id,
        payload.name,
        payload.amount_minor,
        payload.split_with,
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    let expense = state.engine.create_expense(cmd).await?;

    state.publish(RoomEvent::ExpenseCreated {
        room_id,
        expense_id: expense.id,
    });
    Ok((StatusCode::CREATED, Json(expense_view(expense))))
}

/// Expenses of a room, newest first.
pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<ExpensesResponse>, ServerError> {
    let expenses = state.engine.room_expenses(room_id, user.id).await?;
    Ok(Json(ExpensesResponse {
        expenses: expenses.into_iter().map(expense_view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((room_id, expense_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.expense(room_id, expense_id, user.id).await?;
    Ok(Json(expense_view(expense)))
}

/// The caller pays their share of an expense.
pub async fn pay_share(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((room_id, expense_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SharePayment>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state
        .engine
        .pay_share(PayShareCmd::new(
            room_id,
            expense_id,
            user.id,
            payload.account_id,
            payload.amount_minor,
        ))
        .await?;

    state.publish(RoomEvent::SharePaid {
        room_id,
        expense_id,
        user_id: user.id,
    });
    Ok(Json(expense_view(expense)))
}

/// The lender closes an expense every borrower has paid.
pub async fn settle(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.settle_expense(expense_id, user.id).await?;

    state.publish(RoomEvent::ExpenseSettled {
        room_id: expense.room_id,
        expense_id,
    });
    Ok(Json(expense_view(expense)))
}

pub async fn remove(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(expense_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
