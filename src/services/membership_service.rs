//! Membership Service - users, their loan counters and borrowing eligibility

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::domain::{DomainError, LoanPolicy, UserRole};
use crate::infrastructure::AppState;
use crate::models::{LoanDto, User};
use crate::models::book_categories::{self, Entity as BookCategoryEntity};
use crate::models::category::Entity as CategoryEntity;
use crate::models::loan::{self, Entity as LoanEntity};
use crate::models::punishment::{self, Entity as PunishmentEntity};
use crate::models::user::{self, Entity as UserEntity, NewUser, UserPatch};
use crate::services::loan_service::{self, LoanFilter};
use crate::services::punishment_service;
use crate::utils::{dates, search_opt};

pub const USER_SEARCH_FIELDS: &[&str] = &["first_name", "second_name", "email", "role"];

#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserFilter {
    pub q: Option<String>,
    pub role: Option<UserRole>,
}

/// Whether a user may take out another loan, and why not
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Eligibility {
    pub user_id: i32,
    pub can_borrow: bool,
    pub active_loans: i32,
    pub max_active_loans: i32,
    /// Loans left before the cap
    pub remaining: i32,
    pub active_punishments: u64,
    pub reasons: Vec<String>,
    /// Set when the user is close to the cap but may still borrow
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserStats {
    pub user_id: i32,
    pub active_loans: i32,
    pub total_loans: i32,
    pub overdue_loans: u64,
    pub on_time_returns: u64,
    pub late_returns: u64,
    /// Days spent borrowing, open loans counted up to now
    pub total_borrow_days: i64,
    pub favorite_category: Option<String>,
    pub active_punishments: u64,
}

pub async fn register_user(state: &AppState, input: NewUser) -> Result<User, DomainError> {
    let first_name = required(&input.first_name, "first_name")?;
    let second_name = required(&input.second_name, "second_name")?;
    let email = normalize_email(&input.email)?;

    ensure_email_free(state.db(), &email, None).await?;

    let now = state.clock().now();
    let model = user::ActiveModel {
        first_name: Set(first_name),
        second_name: Set(second_name),
        email: Set(email),
        role: Set(input.role.as_str().to_string()),
        address: Set(input.address.filter(|a| !a.trim().is_empty())),
        born: Set(input.born),
        active_loans: Set(0),
        total_loans: Set(0),
        joined_at: Set(now),
        last_activity_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db())
    .await?;

    tracing::info!("User {} registered as {}", model.id, model.role);
    Ok(User::from(model))
}

pub async fn update_user(state: &AppState, id: i32, patch: UserPatch) -> Result<User, DomainError> {
    let existing = find_user(state.db(), id).await?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(first_name) = &patch.first_name {
        active.first_name = Set(required(first_name, "first_name")?);
    }
    if let Some(second_name) = &patch.second_name {
        active.second_name = Set(required(second_name, "second_name")?);
    }
    if let Some(email) = &patch.email {
        let email = normalize_email(email)?;
        ensure_email_free(state.db(), &email, Some(id)).await?;
        active.email = Set(email);
    }
    if let Some(role) = patch.role {
        active.role = Set(role.as_str().to_string());
    }
    if let Some(address) = patch.address {
        active.address = Set(address);
    }
    if let Some(born) = patch.born {
        active.born = Set(born);
    }
    active.updated_at = Set(state.clock().now());

    let model = active.update(state.db()).await?;
    tracing::info!("User {} updated", id);
    Ok(User::from(model))
}

/// Delete a member together with their closed loan history and the
/// punishments they received.
pub async fn remove_user(state: &AppState, id: i32) -> Result<(), DomainError> {
    find_user(state.db(), id).await?;

    let _guard = state.locks().lock_user(id).await;
    let txn = state.db().begin().await?;

    find_user(&txn, id).await?;

    let open_loans = LoanEntity::find()
        .filter(loan::Column::UserId.eq(id))
        .filter(loan::Column::ReturnedAt.is_null())
        .count(&txn)
        .await?;
    if open_loans > 0 {
        tracing::warn!("Refusing to delete user {}: {} open loan(s)", id, open_loans);
        return Err(DomainError::Conflict(format!(
            "user {} has {} unreturned loan(s)",
            id, open_loans
        )));
    }

    let issued = PunishmentEntity::find()
        .filter(punishment::Column::PunisherId.eq(id))
        .count(&txn)
        .await?;
    if issued > 0 {
        return Err(DomainError::Conflict(format!(
            "user {} issued {} punishment(s) that reference them",
            id, issued
        )));
    }

    PunishmentEntity::delete_many()
        .filter(punishment::Column::UserId.eq(id))
        .exec(&txn)
        .await?;

    let history: Vec<i32> = LoanEntity::find()
        .filter(loan::Column::UserId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();
    if !history.is_empty() {
        // Detach anything still citing these loans
        PunishmentEntity::update_many()
            .col_expr(punishment::Column::LoanId, Expr::value(Option::<i32>::None))
            .filter(punishment::Column::LoanId.is_in(history))
            .exec(&txn)
            .await?;
        LoanEntity::delete_many()
            .filter(loan::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
    }

    UserEntity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    state.locks().forget_user(id);
    tracing::info!("User {} deleted", id);
    Ok(())
}

pub async fn get_user(state: &AppState, id: i32) -> Result<User, DomainError> {
    Ok(User::from(find_user(state.db(), id).await?))
}

/// Users sorted by name
pub async fn list_users(state: &AppState, filter: UserFilter) -> Result<Vec<User>, DomainError> {
    let mut query = UserEntity::find();
    if let Some(role) = filter.role {
        query = query.filter(user::Column::Role.eq(role.as_str()));
    }

    let users: Vec<User> = query
        .order_by_asc(user::Column::FirstName)
        .order_by_asc(user::Column::SecondName)
        .all(state.db())
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(search_opt(users, USER_SEARCH_FIELDS, filter.q.as_deref()))
}

/// Loan history of one user, newest first
pub async fn user_loans(state: &AppState, id: i32) -> Result<Vec<LoanDto>, DomainError> {
    find_user(state.db(), id).await?;
    loan_service::list_loans(
        state,
        LoanFilter {
            user_id: Some(id),
            ..Default::default()
        },
    )
    .await
}

/// True iff the user is under the loan cap and not currently punished
pub async fn can_borrow(state: &AppState, user_id: i32) -> Result<bool, DomainError> {
    Ok(eligibility(state, user_id).await?.can_borrow)
}

pub async fn eligibility(state: &AppState, user_id: i32) -> Result<Eligibility, DomainError> {
    let user = find_user(state.db(), user_id).await?;
    evaluate(state.db(), state.policy(), &user, state.clock().now()).await
}

/// Eligibility of an already loaded user, on whichever connection the caller
/// is using.
pub(crate) async fn evaluate<C>(
    conn: &C,
    policy: &LoanPolicy,
    user: &user::Model,
    now: DateTime<Utc>,
) -> Result<Eligibility, DomainError>
where
    C: ConnectionTrait,
{
    let active_punishments = punishment_service::active_count(conn, user.id, now).await?;
    let mut reasons = Vec::new();

    if user.active_loans >= policy.max_active_loans {
        reasons.push(format!(
            "user already holds {} of {} allowed loans",
            user.active_loans, policy.max_active_loans
        ));
    }
    if active_punishments > 0 {
        reasons.push(format!(
            "user has {} active punishment(s)",
            active_punishments
        ));
    }

    let can_borrow = reasons.is_empty();
    let warning = (can_borrow && user.active_loans >= policy.loan_warning_threshold).then(|| {
        format!(
            "user holds {} loans; the limit is {}",
            user.active_loans, policy.max_active_loans
        )
    });

    Ok(Eligibility {
        user_id: user.id,
        can_borrow,
        active_loans: user.active_loans,
        max_active_loans: policy.max_active_loans,
        remaining: (policy.max_active_loans - user.active_loans).max(0),
        active_punishments,
        reasons,
        warning,
    })
}

/// Shift a user's loan counters in one conditional statement and bump their
/// activity timestamp.
///
/// Only the loan lifecycle calls this, inside its transaction while holding
/// the user's lock. Refused with `InvariantViolation` when the result would
/// break `0 <= active_loans <= total_loans`.
pub(crate) async fn adjust_loan_counters<C>(
    conn: &C,
    user_id: i32,
    active_delta: i32,
    total_delta: i32,
    now: DateTime<Utc>,
) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    let active = Expr::col(user::Column::ActiveLoans).add(active_delta);
    let total = Expr::col(user::Column::TotalLoans).add(total_delta);

    let result = UserEntity::update_many()
        .col_expr(user::Column::ActiveLoans, active.clone())
        .col_expr(user::Column::TotalLoans, total.clone())
        .col_expr(user::Column::LastActivityAt, Expr::value(now))
        .col_expr(user::Column::UpdatedAt, Expr::value(now))
        .filter(user::Column::Id.eq(user_id))
        .filter(Expr::expr(active.clone()).gte(0))
        .filter(Expr::expr(active).lte(total))
        .exec(conn)
        .await?;

    if result.rows_affected != 1 {
        tracing::error!(
            user_id,
            active_delta,
            total_delta,
            "Loan counter adjustment refused: would break 0 <= active <= total"
        );
        return Err(DomainError::InvariantViolation(format!(
            "adjusting user {} counters by ({}, {}) breaks 0 <= active <= total",
            user_id, active_delta, total_delta
        )));
    }

    Ok(())
}

pub async fn user_stats(state: &AppState, user_id: i32) -> Result<UserStats, DomainError> {
    let user = find_user(state.db(), user_id).await?;
    let now = state.clock().now();

    let loans = LoanEntity::find()
        .filter(loan::Column::UserId.eq(user_id))
        .all(state.db())
        .await?;

    let mut on_time_returns = 0;
    let mut late_returns = 0;
    let mut overdue_loans = 0;
    let mut total_borrow_days = 0;
    for l in &loans {
        match l.returned_at {
            Some(_) if l.was_late() => late_returns += 1,
            Some(_) => on_time_returns += 1,
            None if l.is_overdue_at(now) => overdue_loans += 1,
            None => {}
        }
        total_borrow_days += dates::days_between(l.started_at, l.returned_at.unwrap_or(now));
    }

    let favorite_category = favorite_category(state, &loans).await?;
    let active_punishments = punishment_service::active_count(state.db(), user_id, now).await?;

    Ok(UserStats {
        user_id,
        active_loans: user.active_loans,
        total_loans: user.total_loans,
        overdue_loans,
        on_time_returns,
        late_returns,
        total_borrow_days,
        favorite_category,
        active_punishments,
    })
}

/// Most borrowed category; ties go to the alphabetically first title
async fn favorite_category(
    state: &AppState,
    loans: &[loan::Model],
) -> Result<Option<String>, DomainError> {
    if loans.is_empty() {
        return Ok(None);
    }

    let mut borrows_per_book: HashMap<i32, u64> = HashMap::new();
    for l in loans {
        *borrows_per_book.entry(l.book_id).or_default() += 1;
    }

    let links = BookCategoryEntity::find()
        .filter(book_categories::Column::BookId.is_in(borrows_per_book.keys().copied().collect::<Vec<_>>()))
        .all(state.db())
        .await?;

    let mut per_category: HashMap<i32, u64> = HashMap::new();
    for link in links {
        let borrows = borrows_per_book.get(&link.book_id).copied().unwrap_or(0);
        *per_category.entry(link.category_id).or_default() += borrows;
    }

    let titles: HashMap<i32, String> = CategoryEntity::find()
        .all(state.db())
        .await?
        .into_iter()
        .map(|c| (c.id, c.title))
        .collect();

    Ok(per_category
        .into_iter()
        .filter_map(|(id, count)| titles.get(&id).map(|t| (count, t.clone())))
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
        .map(|(_, title)| title))
}

pub(crate) async fn find_user<C>(conn: &C, id: i32) -> Result<user::Model, DomainError>
where
    C: ConnectionTrait,
{
    UserEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| DomainError::not_found("user", id))
}

fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(DomainError::Validation(format!(
            "'{}' is not a valid email address",
            raw.trim()
        ))),
    }
}

async fn ensure_email_free<C>(conn: &C, email: &str, except: Option<i32>) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    let mut query = UserEntity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }

    if query.count(conn).await? > 0 {
        return Err(DomainError::Conflict(format!(
            "email '{}' is already registered",
            email
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_lowercased_and_trimmed() {
        assert_eq!(
            normalize_email("  Ahmet@Example.COM ").unwrap(),
            "ahmet@example.com"
        );
    }

    #[test]
    fn test_email_needs_text_on_both_sides_of_at() {
        assert!(normalize_email("ahmet").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ahmet@").is_err());
    }
}
