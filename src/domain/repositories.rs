//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DomainError;

/// Author data for API responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub second_name: String,
    pub bio: Option<String>,
    pub born: Option<NaiveDate>,
    pub book_count: u64,
}

/// Input for creating an author
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewAuthor {
    pub first_name: String,
    pub second_name: String,
    pub bio: Option<String>,
    pub born: Option<NaiveDate>,
}

/// Repository trait for Author entity
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Find all authors
    async fn find_all(&self) -> Result<Vec<Author>, DomainError>;

    /// Find an author by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<Author>, DomainError>;

    /// Create a new author
    async fn create(&self, input: NewAuthor) -> Result<Author, DomainError>;

    /// Delete an author. Fails with `Conflict` while books reference them.
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

/// Category with the copy figures shown on the categories page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Category {
    pub id: i32,
    pub title: String,
    pub book_count: u64,
    pub available_books: u64,
    pub borrowed_books: u64,
}

/// Repository trait for Category entity
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Category>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Category>, DomainError>;

    /// Create a category. Titles are unique.
    async fn create(&self, title: String) -> Result<Category, DomainError>;

    async fn rename(&self, id: i32, title: String) -> Result<Category, DomainError>;

    /// Delete a category. Blocked with `Conflict` while any book uses it.
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}
