//! SeaORM implementation of CategoryRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Category, CategoryRepository, DomainError};
use crate::models::book::Entity as BookEntity;
use crate::models::book_categories::{self, Entity as BookCategoryEntity};
use crate::models::category::{self, ActiveModel, Column, Entity as CategoryEntity};
use crate::utils::Clock;

/// SeaORM-based implementation of CategoryRepository
pub struct SeaOrmCategoryRepository {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

#[derive(Default, Clone, Copy)]
struct Counts {
    books: u64,
    available: u64,
    borrowed: u64,
}

impl SeaOrmCategoryRepository {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Per-category title counts, split by whether a copy is on the shelf.
    async fn counts(&self) -> Result<HashMap<i32, Counts>, DomainError> {
        let links = BookCategoryEntity::find().all(&self.db).await?;
        let availability: HashMap<i32, i32> = BookEntity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|b| (b.id, b.available_copies))
            .collect();

        let mut counts: HashMap<i32, Counts> = HashMap::new();
        for link in links {
            let entry = counts.entry(link.category_id).or_default();
            entry.books += 1;
            match availability.get(&link.book_id) {
                Some(available) if *available > 0 => entry.available += 1,
                Some(_) => entry.borrowed += 1,
                None => {}
            }
        }
        Ok(counts)
    }

    fn to_domain(model: category::Model, counts: Counts) -> Category {
        Category {
            id: model.id,
            title: model.title,
            book_count: counts.books,
            available_books: counts.available,
            borrowed_books: counts.borrowed,
        }
    }

    async fn ensure_title_free(&self, title: &str, except: Option<i32>) -> Result<(), DomainError> {
        let existing = CategoryEntity::find()
            .filter(Column::Title.eq(title))
            .one(&self.db)
            .await?;

        match existing {
            Some(c) if Some(c.id) != except => Err(DomainError::Conflict(format!(
                "category '{}' already exists",
                title
            ))),
            _ => Ok(()),
        }
    }
}

fn clean_title(title: String) -> Result<String, DomainError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(DomainError::Validation("category title is required".into()));
    }
    Ok(title)
}

#[async_trait]
impl CategoryRepository for SeaOrmCategoryRepository {
    async fn find_all(&self) -> Result<Vec<Category>, DomainError> {
        let categories = CategoryEntity::find()
            .order_by_asc(Column::Title)
            .all(&self.db)
            .await?;
        let counts = self.counts().await?;

        Ok(categories
            .into_iter()
            .map(|c| {
                let n = counts.get(&c.id).copied().unwrap_or_default();
                Self::to_domain(c, n)
            })
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Category>, DomainError> {
        let Some(category) = CategoryEntity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let counts = self.counts().await?;
        let n = counts.get(&id).copied().unwrap_or_default();
        Ok(Some(Self::to_domain(category, n)))
    }

    async fn create(&self, title: String) -> Result<Category, DomainError> {
        let title = clean_title(title)?;
        self.ensure_title_free(&title, None).await?;

        let now = self.clock.now();
        let category = ActiveModel {
            title: Set(title),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = category.insert(&self.db).await?;
        tracing::info!("Category {} created: {}", result.id, result.title);

        Ok(Self::to_domain(result, Counts::default()))
    }

    async fn rename(&self, id: i32, title: String) -> Result<Category, DomainError> {
        let title = clean_title(title)?;
        let existing = CategoryEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("category", id))?;
        self.ensure_title_free(&title, Some(id)).await?;

        let mut active: ActiveModel = existing.into();
        active.title = Set(title);
        active.updated_at = Set(self.clock.now());
        active.update(&self.db).await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", id))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let in_use = BookCategoryEntity::find()
            .filter(book_categories::Column::CategoryId.eq(id))
            .count(&self.db)
            .await?;

        if in_use > 0 {
            return Err(DomainError::Conflict(format!(
                "category {} is assigned to {} book(s)",
                id, in_use
            )));
        }

        let result = CategoryEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("category", id));
        }

        Ok(())
    }
}
