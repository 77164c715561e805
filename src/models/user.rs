use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::UserRole;
use crate::utils::{FieldValue, Searchable};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub first_name: String,
    pub second_name: String,
    /// Stored lowercased; unique.
    #[sea_orm(unique)]
    pub email: String,
    pub role: String, // 'admin', 'librarian', 'user'
    pub address: Option<String>,
    pub born: Option<Date>,
    /// Unreturned loans. Written only by the loan lifecycle.
    pub active_loans: i32,
    /// Loans ever taken. Written only by the loan lifecycle.
    pub total_loans: i32,
    pub joined_at: DateTimeUtc,
    pub last_activity_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.second_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub second_name: String,
    pub email: String,
    pub role: String,
    pub address: Option<String>,
    pub born: Option<NaiveDate>,
    pub active_loans: i32,
    pub total_loans: i32,
    pub joined_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            second_name: model.second_name,
            email: model.email,
            role: model.role,
            address: model.address,
            born: model.born,
            active_loans: model.active_loans,
            total_loans: model.total_loans,
            joined_at: model.joined_at,
            last_activity_at: model.last_activity_at,
        }
    }
}

impl Searchable for User {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "first_name" => (&self.first_name).into(),
            "second_name" => (&self.second_name).into(),
            "email" => (&self.email).into(),
            "role" => (&self.role).into(),
            _ => FieldValue::Absent,
        }
    }
}

/// Input for registering a user
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    pub first_name: String,
    pub second_name: String,
    pub email: String,
    pub role: UserRole,
    pub address: Option<String>,
    pub born: Option<NaiveDate>,
}

/// Partial update. Loan counters are not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub second_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub born: Option<Option<NaiveDate>>,
}
