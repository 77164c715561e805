use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::LoanStatus;
use crate::utils::{FieldValue, Searchable, dates};

/// Loan row. State is derived from `returned_at` and `ended_at` against the
/// current time; there is no status column.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub started_at: DateTimeUtc,
    /// Planned due date
    pub ended_at: DateTimeUtc,
    pub returned_at: Option<DateTimeUtc>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn status_at(&self, now: DateTimeUtc) -> LoanStatus {
        if self.returned_at.is_some() {
            LoanStatus::Returned
        } else if dates::is_overdue(self.ended_at, self.returned_at, now) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }

    pub fn is_overdue_at(&self, now: DateTimeUtc) -> bool {
        dates::is_overdue(self.ended_at, self.returned_at, now)
    }

    /// Returned after the due date
    pub fn was_late(&self) -> bool {
        self.returned_at.is_some_and(|r| r > self.ended_at)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Book,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    User,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Loan enriched with derived state and display names
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanDto {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub status: LoanStatus,
    pub is_overdue: bool,
    /// Whole days past the due date; 0 unless overdue
    pub days_overdue: i64,
    pub user_name: String,
    pub book_title: String,
}

impl LoanDto {
    pub fn new(loan: Model, user_name: String, book_title: String, now: DateTime<Utc>) -> Self {
        let status = loan.status_at(now);
        let is_overdue = status == LoanStatus::Overdue;
        let days_overdue = if is_overdue {
            dates::days_between(loan.ended_at, now)
        } else {
            0
        };

        Self {
            id: loan.id,
            user_id: loan.user_id,
            book_id: loan.book_id,
            started_at: loan.started_at,
            ended_at: loan.ended_at,
            returned_at: loan.returned_at,
            notes: loan.notes,
            status,
            is_overdue,
            days_overdue,
            user_name,
            book_title,
        }
    }
}

impl Searchable for LoanDto {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "book_title" => (&self.book_title).into(),
            "user_name" => (&self.user_name).into(),
            "status" => self.status.as_str().into(),
            _ => FieldValue::Absent,
        }
    }
}

/// Input for creating a loan
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLoan {
    pub user_id: i32,
    pub book_id: i32,
    pub duration_days: i64,
    pub notes: Option<String>,
}
