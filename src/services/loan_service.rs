//! Loan Service - the loan state machine
//!
//! A loan is created ACTIVE, becomes OVERDUE by the passage of time alone,
//! and ends RETURNED. Creation and return each move three counters (the
//! book's shelf count and the user's two loan counters) together with the
//! loan row in one transaction, under the book lock and then the user lock.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::domain::{DomainError, LoanStatus};
use crate::infrastructure::AppState;
use crate::models::LoanDto;
use crate::models::book::{self, Entity as BookEntity};
use crate::models::loan::{self, Entity as LoanEntity, NewLoan};
use crate::models::user::{self, Entity as UserEntity};
use crate::services::{catalog_service, membership_service};
use crate::utils::{dates, search_opt};

pub const LOAN_SEARCH_FIELDS: &[&str] = &["book_title", "user_name"];

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub q: Option<String>,
    pub limit: Option<u64>,
}

/// Result of closing a loan
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub loan: LoanDto,
    /// The loan was past its due date when it came back
    pub was_overdue: bool,
}

/// Lend one copy of `book_id` to `user_id` for `duration_days`.
///
/// Eligibility is judged before availability, so a user at the cap is
/// refused even when copies are on the shelf.
pub async fn create_loan(state: &AppState, input: NewLoan) -> Result<LoanDto, DomainError> {
    let policy = state.policy();
    if !policy.loan_duration_allowed(input.duration_days) {
        return Err(DomainError::Validation(format!(
            "duration_days must be between {} and {}",
            policy.min_loan_days, policy.max_loan_days
        )));
    }

    // Unknown ids are refused before they get a lock entry
    membership_service::find_user(state.db(), input.user_id).await?;
    catalog_service::find_book(state.db(), input.book_id).await?;

    let _guard = state.locks().lock_loan(input.book_id, input.user_id).await;
    let now = state.clock().now();
    let txn = state.db().begin().await?;

    let user = membership_service::find_user(&txn, input.user_id).await?;
    let book = catalog_service::find_book(&txn, input.book_id).await?;

    let eligibility = membership_service::evaluate(&txn, policy, &user, now).await?;
    if !eligibility.can_borrow {
        tracing::warn!(
            "Loan refused for user {}: {}",
            user.id,
            eligibility.reasons.join("; ")
        );
        return Err(DomainError::EligibilityDenied(eligibility.reasons.join("; ")));
    }

    if book.available_copies == 0 {
        tracing::warn!("Loan refused: no copies of book {} left", book.id);
        return Err(DomainError::CapacityExceeded(format!(
            "all {} copies of '{}' are on loan",
            book.total_copies, book.title
        )));
    }

    catalog_service::adjust_copies(&txn, book.id, -1).await?;
    membership_service::adjust_loan_counters(&txn, user.id, 1, 1, now).await?;

    let model = loan::ActiveModel {
        user_id: Set(user.id),
        book_id: Set(book.id),
        started_at: Set(now),
        ended_at: Set(dates::add_days(now, input.duration_days)),
        returned_at: Set(None),
        notes: Set(input.notes.filter(|n| !n.trim().is_empty())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        "Loan {} created: book {} to user {}, due {}",
        model.id,
        book.id,
        user.id,
        dates::format_date(model.ended_at)
    );

    Ok(LoanDto::new(model, user.full_name(), book.title, now))
}

/// Close a loan. A second return of the same loan is refused.
pub async fn return_loan(state: &AppState, loan_id: i32) -> Result<ReturnOutcome, DomainError> {
    let current = find_loan(state.db(), loan_id).await?;
    if current.returned_at.is_some() {
        return Err(DomainError::AlreadyReturned(loan_id));
    }

    let _guard = state.locks().lock_loan(current.book_id, current.user_id).await;
    let now = state.clock().now();
    let txn = state.db().begin().await?;

    let closed = LoanEntity::update_many()
        .col_expr(loan::Column::ReturnedAt, Expr::value(now))
        .col_expr(loan::Column::UpdatedAt, Expr::value(now))
        .filter(loan::Column::Id.eq(loan_id))
        .filter(loan::Column::ReturnedAt.is_null())
        .exec(&txn)
        .await?;
    if closed.rows_affected != 1 {
        tracing::warn!("Loan {} was returned concurrently", loan_id);
        return Err(DomainError::AlreadyReturned(loan_id));
    }

    catalog_service::adjust_copies(&txn, current.book_id, 1).await?;
    membership_service::adjust_loan_counters(&txn, current.user_id, -1, 0, now).await?;

    let model = find_loan(&txn, loan_id).await?;
    let mut described = describe(&txn, vec![model], now).await?;
    txn.commit().await?;

    let loan = described
        .pop()
        .ok_or_else(|| DomainError::not_found("loan", loan_id))?;
    let was_overdue = now > loan.ended_at;

    if was_overdue {
        tracing::info!(
            "Loan {} returned {} day(s) late",
            loan_id,
            dates::days_between(loan.ended_at, now)
        );
    } else {
        tracing::info!("Loan {} returned", loan_id);
    }

    Ok(ReturnOutcome { loan, was_overdue })
}

/// Recomputed from the clock on every call
pub async fn is_overdue(state: &AppState, loan_id: i32) -> Result<bool, DomainError> {
    let loan = find_loan(state.db(), loan_id).await?;
    Ok(loan.is_overdue_at(state.clock().now()))
}

pub async fn get_loan(state: &AppState, loan_id: i32) -> Result<LoanDto, DomainError> {
    let model = find_loan(state.db(), loan_id).await?;
    let mut described = describe(state.db(), vec![model], state.clock().now()).await?;
    described
        .pop()
        .ok_or_else(|| DomainError::not_found("loan", loan_id))
}

/// Loans newest first
pub async fn list_loans(state: &AppState, filter: LoanFilter) -> Result<Vec<LoanDto>, DomainError> {
    let now = state.clock().now();
    let mut query = LoanEntity::find();

    if let Some(user_id) = filter.user_id {
        query = query.filter(loan::Column::UserId.eq(user_id));
    }
    if let Some(book_id) = filter.book_id {
        query = query.filter(loan::Column::BookId.eq(book_id));
    }
    query = match filter.status {
        Some(LoanStatus::Returned) => query.filter(loan::Column::ReturnedAt.is_not_null()),
        Some(LoanStatus::Overdue) => query
            .filter(loan::Column::ReturnedAt.is_null())
            .filter(loan::Column::EndedAt.lt(now)),
        Some(LoanStatus::Active) => query
            .filter(loan::Column::ReturnedAt.is_null())
            .filter(loan::Column::EndedAt.gte(now)),
        None => query,
    };

    let models = query
        .order_by_desc(loan::Column::StartedAt)
        .order_by_desc(loan::Column::Id)
        .all(state.db())
        .await?;

    let mut loans = search_opt(
        describe(state.db(), models, now).await?,
        LOAN_SEARCH_FIELDS,
        filter.q.as_deref(),
    );
    if let Some(limit) = filter.limit {
        loans.truncate(limit as usize);
    }
    Ok(loans)
}

async fn find_loan<C>(conn: &C, loan_id: i32) -> Result<loan::Model, DomainError>
where
    C: ConnectionTrait,
{
    LoanEntity::find_by_id(loan_id)
        .one(conn)
        .await?
        .ok_or_else(|| DomainError::not_found("loan", loan_id))
}

/// Attach borrower names and book titles
async fn describe<C>(
    conn: &C,
    models: Vec<loan::Model>,
    now: DateTime<Utc>,
) -> Result<Vec<LoanDto>, DomainError>
where
    C: ConnectionTrait,
{
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids: Vec<i32> = models.iter().map(|l| l.user_id).collect();
    let book_ids: Vec<i32> = models.iter().map(|l| l.book_id).collect();

    let users: HashMap<i32, String> = UserEntity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u.full_name()))
        .collect();
    let titles: HashMap<i32, String> = BookEntity::find()
        .filter(book::Column::Id.is_in(book_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|b| (b.id, b.title))
        .collect();

    Ok(models
        .into_iter()
        .map(|l| {
            let user_name = users.get(&l.user_id).cloned().unwrap_or_default();
            let book_title = titles.get(&l.book_id).cloned().unwrap_or_default();
            LoanDto::new(l, user_name, book_title, now)
        })
        .collect())
}
