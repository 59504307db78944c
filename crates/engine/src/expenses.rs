//! Expense primitives.
//!
//! An `Expense` is a cost paid by one lender inside a room and split evenly
//! between one or more borrowers. Each participant has a [`Share`]; the
//! lender's share owes nothing.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, user_expenses,
    util::{normalize_optional_text, normalize_required, parse_uuid},
};

/// A participant's role and share of an expense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub is_lender: bool,
    pub amount_owed_minor: i64,
    pub is_settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
    pub paid_from_account_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: Uuid,
    pub room_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub is_settled: bool,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    pub shares: Vec<Share>,
}

impl Expense {
    pub fn new(
        room_id: Uuid,
        name: &str,
        description: Option<&str>,
        amount_minor: i64,
    ) -> ResultEngine<Self> {
        let name = normalize_required(name, "expense name")?;
        if amount_minor <= 0 {
            return Err(EngineError::InvalidInput(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            room_id,
            name,
            description: normalize_optional_text(description),
            amount_minor,
            is_settled: false,
            created_at: Utc::now(),
            settled_at: None,
            shares: Vec::new(),
        })
    }

    /// Build the share rows for `lender` and `borrowers`.
    ///
    /// Borrowers owe an even split of the amount (see
    /// [`MoneyCents::split_even`]). Rows that owe nothing, the lender's and
    /// any 0-cent borrower share, start settled.
    pub(crate) fn share_rows(
        &self,
        lender: Uuid,
        borrowers: &[Uuid],
    ) -> ResultEngine<Vec<user_expenses::ActiveModel>> {
        let owed = MoneyCents::new(self.amount_minor)
            .split_even(borrowers.len())
            .ok_or_else(|| {
                EngineError::InvalidInput("split list must not be empty".to_string())
            })?;

        let lender_row = user_expenses::ActiveModel {
            user_id: ActiveValue::Set(lender.to_string()),
            expense_id: ActiveValue::Set(self.id.to_string()),
            is_lender: ActiveValue::Set(true),
            amount_owed_minor: ActiveValue::Set(0),
            is_settled: ActiveValue::Set(true),
            settled_at: ActiveValue::Set(None),
            paid_from_account_id: ActiveValue::Set(None),
        };

        let borrower_rows = borrowers.iter().zip(owed).map(|(user_id, amount)| {
            let owes_nothing = !amount.is_positive();
            user_expenses::ActiveModel {
                user_id: ActiveValue::Set(user_id.to_string()),
                expense_id: ActiveValue::Set(self.id.to_string()),
                is_lender: ActiveValue::Set(false),
                amount_owed_minor: ActiveValue::Set(amount.cents()),
                is_settled: ActiveValue::Set(owes_nothing),
                settled_at: ActiveValue::Set(owes_nothing.then_some(self.created_at)),
                paid_from_account_id: ActiveValue::Set(None),
            }
        });

        Ok(std::iter::once(lender_row).chain(borrower_rows).collect())
    }

    pub fn lender(&self) -> Option<&Share> {
        self.shares.iter().find(|share| share.is_lender)
    }

    pub fn borrowers(&self) -> impl Iterator<Item = &Share> {
        self.shares.iter().filter(|share| !share.is_lender)
    }

    pub fn share(&self, user_id: Uuid) -> Option<&Share> {
        self.shares.iter().find(|share| share.user_id == user_id)
    }

    /// `true` once every borrower has paid; the lender may then close the
    /// expense.
    pub fn all_borrowers_settled(&self) -> bool {
        self.borrowers().all(|share| share.is_settled)
    }

    pub fn is_lender(&self, user_id: Uuid) -> bool {
        self.lender().is_some_and(|share| share.user_id == user_id)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub room_id: String,
    pub name: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub is_settled: bool,
    pub created_at: DateTimeUtc,
    pub settled_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rooms::Entity",
        from = "Column::RoomId",
        to = "super::rooms::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Rooms,
    #[sea_orm(has_many = "super::user_expenses::Entity")]
    UserExpenses,
}

impl Related<super::rooms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rooms.def()
    }
}

impl Related<super::user_expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserExpenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(value: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            room_id: ActiveValue::Set(value.room_id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            description: ActiveValue::Set(value.description.clone()),
            amount_minor: ActiveValue::Set(value.amount_minor),
            is_settled: ActiveValue::Set(value.is_settled),
            created_at: ActiveValue::Set(value.created_at),
            settled_at: ActiveValue::Set(value.settled_at),
        }
    }
}

impl TryFrom<(Model, Vec<Share>)> for Expense {
    type Error = EngineError;

    fn try_from((model, shares): (Model, Vec<Share>)) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            room_id: parse_uuid(&model.room_id, "room")?,
            name: model.name,
            description: model.description,
            amount_minor: model.amount_minor,
            is_settled: model.is_settled,
            created_at: model.created_at,
            settled_at: model.settled_at,
            shares,
        })
    }
}
