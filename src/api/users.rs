use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::api::{ApiError, AppJson, AppPath, AppQuery};
use crate::infrastructure::AppState;
use crate::models::User;
use crate::models::user::{NewUser, UserPatch};
use crate::services::{Eligibility, UserFilter, UserStats, membership_service};

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("q" = Option<String>, Query, description = "Substring over names, email and role"),
        ("role" = Option<String>, Query, description = "admin, librarian or user")
    ),
    responses((status = 200, description = "List of users"))
)]
pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<UserFilter>,
) -> Result<Json<Value>, ApiError> {
    let users = membership_service::list_users(&state, filter).await?;
    Ok(Json(json!({
        "total": users.len(),
        "users": users
    })))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(input): AppJson<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = membership_service::register_user(&state, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(membership_service::get_user(&state, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(patch): AppJson<UserPatch>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(membership_service::update_user(&state, id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has open loans or issued punishments")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Value>, ApiError> {
    membership_service::remove_user(&state, id).await?;
    Ok(Json(json!({ "message": "User deleted" })))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/loans",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Loan history, newest first"),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_user_loans(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Value>, ApiError> {
    let loans = membership_service::user_loans(&state, id).await?;
    Ok(Json(json!({
        "total": loans.len(),
        "loans": loans
    })))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/eligibility",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Whether the user may borrow", body = Eligibility),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_eligibility(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Eligibility>, ApiError> {
    Ok(Json(membership_service::eligibility(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/stats",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Borrowing statistics", body = UserStats),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_stats(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(membership_service::user_stats(&state, id).await?))
}
