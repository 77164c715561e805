use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::{FieldValue, Searchable};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author_id: Option<i32>,
    pub edition: i32,
    pub description: Option<String>,
    pub publish_year: Option<i32>,
    /// Lending units owned by the library.
    pub total_copies: i32,
    /// Copies on the shelf. Only the loan lifecycle moves this between
    /// 0 and `total_copies`.
    pub available_copies: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::author::Entity",
        from = "Column::AuthorId",
        to = "super::author::Column::Id"
    )]
    Author,
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::book_categories::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::book_categories::Relation::Book.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author_id: Option<i32>,
    pub author: Option<String>,
    pub edition: i32,
    pub description: Option<String>,
    pub publish_year: Option<i32>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub loaned_copies: i32,
    /// `available` while at least one copy is on the shelf, else `borrowed`
    pub status: String,
    pub category_ids: Vec<i32>,
    pub categories: Vec<String>,
    pub borrow_count: u64,
    pub last_borrowed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn status_for(available_copies: i32) -> &'static str {
        if available_copies > 0 {
            "available"
        } else {
            "borrowed"
        }
    }
}

impl Searchable for Book {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "title" => (&self.title).into(),
            "isbn" => (&self.isbn).into(),
            "author" => self.author.as_ref().into(),
            "category" => self.categories.join(", ").into(),
            "edition" => self.edition.into(),
            "description" => self.description.as_ref().into(),
            _ => FieldValue::Absent,
        }
    }
}

/// Input for registering a book
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewBook {
    pub title: String,
    pub isbn: String,
    pub author_id: Option<i32>,
    #[serde(default = "default_edition")]
    pub edition: i32,
    pub description: Option<String>,
    pub publish_year: Option<i32>,
    #[serde(default = "default_copies")]
    pub total_copies: i32,
    #[serde(default)]
    pub category_ids: Vec<i32>,
}

fn default_edition() -> i32 {
    1
}

fn default_copies() -> i32 {
    1
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub isbn: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub author_id: Option<Option<i32>>,
    pub edition: Option<i32>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub publish_year: Option<Option<i32>>,
    pub total_copies: Option<i32>,
    pub category_ids: Option<Vec<i32>>,
}
