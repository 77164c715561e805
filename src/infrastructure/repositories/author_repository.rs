//! SeaORM implementation of AuthorRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Author, AuthorRepository, DomainError, NewAuthor};
use crate::models::author::{self, ActiveModel, Entity as AuthorEntity};
use crate::models::book::{self, Entity as BookEntity};
use crate::utils::Clock;

/// SeaORM-based implementation of AuthorRepository
pub struct SeaOrmAuthorRepository {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl SeaOrmAuthorRepository {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    fn to_domain(model: author::Model, book_count: u64) -> Author {
        Author {
            id: model.id,
            first_name: model.first_name,
            second_name: model.second_name,
            bio: model.bio,
            born: model.born,
            book_count,
        }
    }

    async fn count_books(&self, author_id: i32) -> Result<u64, DomainError> {
        Ok(BookEntity::find()
            .filter(book::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await?)
    }
}

#[async_trait]
impl AuthorRepository for SeaOrmAuthorRepository {
    async fn find_all(&self) -> Result<Vec<Author>, DomainError> {
        let authors = AuthorEntity::find().all(&self.db).await?;
        let books = BookEntity::find().all(&self.db).await?;

        let mut counts: HashMap<i32, u64> = HashMap::new();
        for author_id in books.iter().filter_map(|b| b.author_id) {
            *counts.entry(author_id).or_insert(0) += 1;
        }

        Ok(authors
            .into_iter()
            .map(|a| {
                let count = counts.get(&a.id).copied().unwrap_or(0);
                Self::to_domain(a, count)
            })
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Author>, DomainError> {
        let Some(author) = AuthorEntity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let count = self.count_books(id).await?;
        Ok(Some(Self::to_domain(author, count)))
    }

    async fn create(&self, input: NewAuthor) -> Result<Author, DomainError> {
        let first_name = input.first_name.trim().to_string();
        let second_name = input.second_name.trim().to_string();
        if first_name.is_empty() || second_name.is_empty() {
            return Err(DomainError::Validation(
                "author first and second name are required".into(),
            ));
        }

        let now = self.clock.now();

        let author = ActiveModel {
            first_name: Set(first_name),
            second_name: Set(second_name),
            bio: Set(input.bio),
            born: Set(input.born),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = author.insert(&self.db).await?;
        tracing::info!("Author {} created: {}", result.id, result.full_name());

        Ok(Self::to_domain(result, 0))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        if self.count_books(id).await? > 0 {
            return Err(DomainError::Conflict(format!(
                "author {} is still referenced by books",
                id
            )));
        }

        let result = AuthorEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("author", id));
        }

        Ok(())
    }
}
