//! Catalog Service - books, their categories, and copy accounting
//!
//! `available_copies` is only ever moved by [`adjust_copies`], which the loan
//! lifecycle calls inside its own transaction.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::{Book, LoanDto};
use crate::models::author::{self, Entity as AuthorEntity};
use crate::models::book::{self, ActiveModel as BookActiveModel, BookPatch, Entity as BookEntity, NewBook};
use crate::models::book_categories::{self, Entity as BookCategoryEntity};
use crate::models::category::{self, Entity as CategoryEntity};
use crate::models::loan::{self, Entity as LoanEntity};
use crate::models::punishment::{self, Entity as PunishmentEntity};
use crate::services::loan_service::{self, LoanFilter};
use crate::utils::search_opt;

/// Fields matched by the `q` parameter of the book listing
pub const BOOK_SEARCH_FIELDS: &[&str] = &["title", "author", "isbn", "category", "edition"];

/// Filter parameters for listing books
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BookFilter {
    pub q: Option<String>,
    pub category_id: Option<i32>,
    pub author_id: Option<i32>,
    /// `true` keeps titles with a copy on the shelf, `false` fully loaned ones
    pub available: Option<bool>,
}

/// Register a new title with all of its copies on the shelf
pub async fn register_book(state: &AppState, input: NewBook) -> Result<Book, DomainError> {
    let title = required(&input.title, "title")?;
    let isbn = required(&input.isbn, "isbn")?;
    if input.total_copies < 1 {
        return Err(DomainError::Validation(
            "total_copies must be at least 1".into(),
        ));
    }
    if input.edition < 1 {
        return Err(DomainError::Validation("edition must be at least 1".into()));
    }

    let now = state.clock().now();
    let txn = state.db().begin().await?;

    ensure_references(&txn, input.author_id, &input.category_ids).await?;

    let new_book = BookActiveModel {
        title: Set(title),
        isbn: Set(isbn),
        author_id: Set(input.author_id),
        edition: Set(input.edition),
        description: Set(input.description),
        publish_year: Set(input.publish_year),
        total_copies: Set(input.total_copies),
        available_copies: Set(input.total_copies),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = new_book.insert(&txn).await?;
    set_categories(&txn, model.id, &input.category_ids).await?;

    txn.commit().await?;

    tracing::info!(
        "Book {} registered: '{}' ({} copies)",
        model.id,
        model.title,
        model.total_copies
    );

    get_book(state, model.id).await
}

/// Partial update. Changing `total_copies` keeps the loaned copies loaned.
pub async fn update_book(state: &AppState, id: i32, patch: BookPatch) -> Result<Book, DomainError> {
    find_book(state.db(), id).await?;

    let _guard = state.locks().lock_book(id).await;
    let now = state.clock().now();
    let txn = state.db().begin().await?;

    let existing = find_book(&txn, id).await?;

    let author_id = patch.author_id.unwrap_or(existing.author_id);
    let category_ids = patch.category_ids.clone().unwrap_or_default();
    ensure_references(&txn, author_id, &category_ids).await?;

    let loaned = existing.total_copies - existing.available_copies;
    let mut active: BookActiveModel = existing.into();

    if let Some(title) = &patch.title {
        active.title = Set(required(title, "title")?);
    }
    if let Some(isbn) = &patch.isbn {
        active.isbn = Set(required(isbn, "isbn")?);
    }
    if let Some(edition) = patch.edition {
        if edition < 1 {
            return Err(DomainError::Validation("edition must be at least 1".into()));
        }
        active.edition = Set(edition);
    }
    if let Some(total) = patch.total_copies {
        if total < 1 {
            return Err(DomainError::Validation(
                "total_copies must be at least 1".into(),
            ));
        }
        if total < loaned {
            return Err(DomainError::Conflict(format!(
                "book {} has {} copies on loan; total cannot drop to {}",
                id, loaned, total
            )));
        }
        active.total_copies = Set(total);
        active.available_copies = Set(total - loaned);
    }
    if patch.author_id.is_some() {
        active.author_id = Set(author_id);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(year) = patch.publish_year {
        active.publish_year = Set(year);
    }
    active.updated_at = Set(now);
    active.update(&txn).await?;

    if patch.category_ids.is_some() {
        BookCategoryEntity::delete_many()
            .filter(book_categories::Column::BookId.eq(id))
            .exec(&txn)
            .await?;
        set_categories(&txn, id, &category_ids).await?;
    }

    txn.commit().await?;
    tracing::info!("Book {} updated", id);

    get_book(state, id).await
}

/// Delete a title. Refused while any copy is out; its returned loan history
/// goes with it.
pub async fn remove_book(state: &AppState, id: i32) -> Result<(), DomainError> {
    find_book(state.db(), id).await?;

    let _guard = state.locks().lock_book(id).await;
    let txn = state.db().begin().await?;

    find_book(&txn, id).await?;

    let open_loans = LoanEntity::find()
        .filter(loan::Column::BookId.eq(id))
        .filter(loan::Column::ReturnedAt.is_null())
        .count(&txn)
        .await?;

    if open_loans > 0 {
        tracing::warn!("Refusing to delete book {}: {} open loan(s)", id, open_loans);
        return Err(DomainError::Conflict(format!(
            "book {} has {} unreturned loan(s)",
            id, open_loans
        )));
    }

    let history: Vec<i32> = LoanEntity::find()
        .filter(loan::Column::BookId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();

    if !history.is_empty() {
        PunishmentEntity::update_many()
            .col_expr(punishment::Column::LoanId, Expr::value(Option::<i32>::None))
            .filter(punishment::Column::LoanId.is_in(history))
            .exec(&txn)
            .await?;
        LoanEntity::delete_many()
            .filter(loan::Column::BookId.eq(id))
            .exec(&txn)
            .await?;
    }

    BookCategoryEntity::delete_many()
        .filter(book_categories::Column::BookId.eq(id))
        .exec(&txn)
        .await?;
    BookEntity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    state.locks().forget_book(id);
    tracing::info!("Book {} deleted", id);

    Ok(())
}

pub async fn get_book(state: &AppState, id: i32) -> Result<Book, DomainError> {
    let model = BookEntity::find_by_id(id)
        .one(state.db())
        .await?
        .ok_or_else(|| DomainError::not_found("book", id))?;

    let mut books = enrich(state.db(), vec![model]).await?;
    books
        .pop()
        .ok_or_else(|| DomainError::not_found("book", id))
}

/// List books, newest first, then apply the substring search
pub async fn list_books(state: &AppState, filter: BookFilter) -> Result<Vec<Book>, DomainError> {
    let mut query = BookEntity::find();

    if let Some(author_id) = filter.author_id {
        query = query.filter(book::Column::AuthorId.eq(author_id));
    }

    if let Some(category_id) = filter.category_id {
        let book_ids: Vec<i32> = BookCategoryEntity::find()
            .filter(book_categories::Column::CategoryId.eq(category_id))
            .all(state.db())
            .await?
            .into_iter()
            .map(|l| l.book_id)
            .collect();
        query = query.filter(book::Column::Id.is_in(book_ids));
    }

    match filter.available {
        Some(true) => query = query.filter(book::Column::AvailableCopies.gt(0)),
        Some(false) => query = query.filter(book::Column::AvailableCopies.eq(0)),
        None => {}
    }

    let models = query
        .order_by_desc(book::Column::CreatedAt)
        .order_by_desc(book::Column::Id)
        .all(state.db())
        .await?;

    let books = enrich(state.db(), models).await?;
    Ok(search_opt(books, BOOK_SEARCH_FIELDS, filter.q.as_deref()))
}

/// Borrow history of one title, newest first
pub async fn book_loans(state: &AppState, id: i32) -> Result<Vec<LoanDto>, DomainError> {
    BookEntity::find_by_id(id)
        .one(state.db())
        .await?
        .ok_or_else(|| DomainError::not_found("book", id))?;

    loan_service::list_loans(
        state,
        LoanFilter {
            book_id: Some(id),
            ..Default::default()
        },
    )
    .await
}

pub(crate) async fn find_book<C>(conn: &C, id: i32) -> Result<book::Model, DomainError>
where
    C: ConnectionTrait,
{
    BookEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| DomainError::not_found("book", id))
}

/// Move a book's shelf count by `delta` in one conditional statement.
///
/// Only the loan lifecycle calls this, inside its transaction and while
/// holding the book's lock. A result outside `[0, total_copies]` is refused
/// as an invariant violation.
pub(crate) async fn adjust_copies<C>(conn: &C, book_id: i32, delta: i32) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    let next = Expr::col(book::Column::AvailableCopies).add(delta);

    let result = BookEntity::update_many()
        .col_expr(book::Column::AvailableCopies, next.clone())
        .filter(book::Column::Id.eq(book_id))
        .filter(Expr::expr(next.clone()).gte(0))
        .filter(Expr::expr(next).lte(Expr::col(book::Column::TotalCopies)))
        .exec(conn)
        .await?;

    if result.rows_affected != 1 {
        tracing::error!(
            book_id,
            delta,
            "Copy adjustment refused: available_copies would leave [0, total_copies]"
        );
        return Err(DomainError::InvariantViolation(format!(
            "adjusting book {} copies by {} breaks 0 <= available <= total",
            book_id, delta
        )));
    }

    Ok(())
}

/// Attach authors, categories and borrow history to raw rows
pub(crate) async fn enrich<C>(conn: &C, models: Vec<book::Model>) -> Result<Vec<Book>, DomainError>
where
    C: ConnectionTrait,
{
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let book_ids: Vec<i32> = models.iter().map(|b| b.id).collect();
    let author_ids: Vec<i32> = models
        .iter()
        .filter_map(|b| b.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors: HashMap<i32, String> = if author_ids.is_empty() {
        HashMap::new()
    } else {
        AuthorEntity::find()
            .filter(author::Column::Id.is_in(author_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|a| (a.id, a.full_name()))
            .collect()
    };

    let links = BookCategoryEntity::find()
        .filter(book_categories::Column::BookId.is_in(book_ids.clone()))
        .all(conn)
        .await?;
    let category_titles: HashMap<i32, String> = CategoryEntity::find()
        .order_by_asc(category::Column::Title)
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c.title))
        .collect();

    let mut categories_by_book: HashMap<i32, Vec<(i32, String)>> = HashMap::new();
    for link in links {
        if let Some(title) = category_titles.get(&link.category_id) {
            categories_by_book
                .entry(link.book_id)
                .or_default()
                .push((link.category_id, title.clone()));
        }
    }

    let loans = LoanEntity::find()
        .filter(loan::Column::BookId.is_in(book_ids))
        .all(conn)
        .await?;
    let mut borrow_stats: HashMap<i32, (u64, Option<chrono::DateTime<chrono::Utc>>)> =
        HashMap::new();
    for l in loans {
        let entry = borrow_stats.entry(l.book_id).or_insert((0, None));
        entry.0 += 1;
        if entry.1.is_none_or(|last| l.started_at > last) {
            entry.1 = Some(l.started_at);
        }
    }

    Ok(models
        .into_iter()
        .map(|m| {
            let mut cats = categories_by_book.remove(&m.id).unwrap_or_default();
            cats.sort_by(|a, b| a.1.cmp(&b.1));
            let (borrow_count, last_borrowed_at) =
                borrow_stats.get(&m.id).copied().unwrap_or((0, None));

            Book {
                id: m.id,
                author: m.author_id.and_then(|id| authors.get(&id).cloned()),
                title: m.title,
                isbn: m.isbn,
                author_id: m.author_id,
                edition: m.edition,
                description: m.description,
                publish_year: m.publish_year,
                total_copies: m.total_copies,
                available_copies: m.available_copies,
                loaned_copies: m.total_copies - m.available_copies,
                status: Book::status_for(m.available_copies).to_string(),
                category_ids: cats.iter().map(|(id, _)| *id).collect(),
                categories: cats.into_iter().map(|(_, title)| title).collect(),
                borrow_count,
                last_borrowed_at,
                created_at: m.created_at,
                updated_at: m.updated_at,
            }
        })
        .collect())
}

fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

async fn ensure_references<C>(
    conn: &C,
    author_id: Option<i32>,
    category_ids: &[i32],
) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    if let Some(author_id) = author_id
        && AuthorEntity::find_by_id(author_id).one(conn).await?.is_none()
    {
        return Err(DomainError::Validation(format!(
            "author {} does not exist",
            author_id
        )));
    }

    let wanted: HashSet<i32> = category_ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(());
    }

    let found = CategoryEntity::find()
        .filter(category::Column::Id.is_in(wanted.iter().copied().collect::<Vec<_>>()))
        .count(conn)
        .await?;

    if found != wanted.len() as u64 {
        return Err(DomainError::Validation(
            "one or more categories do not exist".into(),
        ));
    }

    Ok(())
}

async fn set_categories<C>(conn: &C, book_id: i32, category_ids: &[i32]) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    let unique: HashSet<i32> = category_ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(());
    }

    let links = unique.into_iter().map(|category_id| book_categories::ActiveModel {
        book_id: Set(book_id),
        category_id: Set(category_id),
    });
    BookCategoryEntity::insert_many(links)
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db;

    async fn setup_test_state() -> AppState {
        let db = db::init_db("sqlite::memory:")
            .await
            .expect("Failed to init DB");
        AppState::new(db)
    }

    #[tokio::test]
    async fn test_adjust_copies_stays_within_bounds() {
        let state = setup_test_state().await;
        let book = register_book(
            &state,
            NewBook {
                title: "1984".into(),
                isbn: "978-0451524935".into(),
                author_id: None,
                edition: 1,
                description: None,
                publish_year: None,
                total_copies: 1,
                category_ids: vec![],
            },
        )
        .await
        .unwrap();

        let over = adjust_copies(state.db(), book.id, 1).await;
        assert!(matches!(over, Err(DomainError::InvariantViolation(_))));

        adjust_copies(state.db(), book.id, -1).await.unwrap();
        let under = adjust_copies(state.db(), book.id, -1).await;
        assert!(matches!(under, Err(DomainError::InvariantViolation(_))));

        let missing = adjust_copies(state.db(), 999, -1).await;
        assert!(matches!(missing, Err(DomainError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn test_list_books_filters_and_searches() {
        let state = setup_test_state().await;
        let orwell = state
            .author_repo
            .create(crate::domain::NewAuthor {
                first_name: "George".into(),
                second_name: "Orwell".into(),
                bio: None,
                born: None,
            })
            .await
            .unwrap();

        for (title, author_id, copies) in [("1984", Some(orwell.id), 1), ("Dönüşüm", None, 2)] {
            register_book(
                &state,
                NewBook {
                    title: title.into(),
                    isbn: format!("isbn-{}", title),
                    author_id,
                    edition: 1,
                    description: None,
                    publish_year: None,
                    total_copies: copies,
                    category_ids: vec![],
                },
            )
            .await
            .unwrap();
        }

        let by_author = list_books(
            &state,
            BookFilter {
                q: Some("orwell".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].author.as_deref(), Some("George Orwell"));

        let everything = list_books(&state, BookFilter::default()).await.unwrap();
        assert_eq!(everything.len(), 2);

        let filtered = list_books(
            &state,
            BookFilter {
                author_id: Some(orwell.id),
                available: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.len(), 1);
    }
}
