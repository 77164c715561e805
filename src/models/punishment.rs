use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::PunishmentKind;

/// Sanction against a user. Whether it is still in force is derived from
/// `ends_at`; nothing about its activity is stored.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "punishments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub punisher_id: i32,
    pub kind: String, // 'late_return', 'damaged_book', 'lost_book', 'violation'
    pub reason: String,
    pub loan_id: Option<i32>,
    pub started_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_active_at(&self, now: DateTimeUtc) -> bool {
        now < self.ends_at
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Punished,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PunisherId",
        to = "super::user::Column::Id"
    )]
    Punisher,
    #[sea_orm(
        belongs_to = "super::loan::Entity",
        from = "Column::LoanId",
        to = "super::loan::Column::Id",
        on_delete = "SetNull"
    )]
    Loan,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Punished.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PunishmentDto {
    pub id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub punisher_id: i32,
    pub punisher_name: String,
    pub kind: String,
    pub reason: String,
    pub loan_id: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    /// Whole days left; 0 once expired
    pub remaining_days: i64,
}

/// Input for applying a punishment
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPunishment {
    pub user_id: i32,
    pub punisher_id: i32,
    pub kind: PunishmentKind,
    pub reason: String,
    pub duration_days: i64,
    pub loan_id: Option<i32>,
}
