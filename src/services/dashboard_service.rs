//! Aggregate counters for the dashboard home page

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::LoanDto;
use crate::models::book::Entity as BookEntity;
use crate::models::loan::{self, Entity as LoanEntity};
use crate::models::punishment::{self, Entity as PunishmentEntity};
use crate::models::user::Entity as UserEntity;
use crate::services::loan_service::{self, LoanFilter};

const RECENT_LOANS: u64 = 5;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryHighlight {
    pub id: i32,
    pub title: String,
    pub book_count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_books: u64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub loaned_copies: i64,
    pub total_users: u64,
    pub users_with_loans: u64,
    pub punished_users: u64,
    pub total_categories: u64,
    pub most_populated_category: Option<CategoryHighlight>,
    pub least_populated_category: Option<CategoryHighlight>,
    pub active_loans: u64,
    pub overdue_loans: u64,
    pub recent_loans: Vec<LoanDto>,
}

pub async fn dashboard_stats(state: &AppState) -> Result<DashboardStats, DomainError> {
    let db = state.db();
    let now = state.clock().now();

    let books = BookEntity::find().all(db).await?;
    let total_copies: i64 = books.iter().map(|b| b.total_copies as i64).sum();
    let available_copies: i64 = books.iter().map(|b| b.available_copies as i64).sum();

    let total_users = UserEntity::find().count(db).await?;

    let open_loans = LoanEntity::find()
        .filter(loan::Column::ReturnedAt.is_null())
        .all(db)
        .await?;
    let users_with_loans = open_loans
        .iter()
        .map(|l| l.user_id)
        .collect::<HashSet<_>>()
        .len() as u64;
    let overdue_loans = open_loans.iter().filter(|l| l.is_overdue_at(now)).count() as u64;
    let active_loans = open_loans.len() as u64 - overdue_loans;

    let punished_users = PunishmentEntity::find()
        .filter(punishment::Column::EndsAt.gt(now))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.user_id)
        .collect::<HashSet<_>>()
        .len() as u64;

    let categories = state.category_repo.find_all().await?;
    let most_populated_category = categories
        .iter()
        .max_by(|a, b| a.book_count.cmp(&b.book_count).then_with(|| b.title.cmp(&a.title)))
        .map(highlight);
    let least_populated_category = categories
        .iter()
        .min_by(|a, b| a.book_count.cmp(&b.book_count).then_with(|| a.title.cmp(&b.title)))
        .map(highlight);

    let recent_loans = loan_service::list_loans(
        state,
        LoanFilter {
            limit: Some(RECENT_LOANS),
            ..Default::default()
        },
    )
    .await?;

    Ok(DashboardStats {
        total_books: books.len() as u64,
        total_copies,
        available_copies,
        loaned_copies: total_copies - available_copies,
        total_users,
        users_with_loans,
        punished_users,
        total_categories: categories.len() as u64,
        most_populated_category,
        least_populated_category,
        active_loans,
        overdue_loans,
        recent_loans,
    })
}

fn highlight(category: &crate::domain::Category) -> CategoryHighlight {
    CategoryHighlight {
        id: category.id,
        title: category.title.clone(),
        book_count: category.book_count,
    }
}
