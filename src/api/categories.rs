use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::api::{ApiError, AppJson, AppPath, AppQuery};
use crate::domain::{Category, DomainError};
use crate::infrastructure::AppState;
use crate::utils::search_opt;

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub title: String,
}

#[utoipa::path(
    get,
    path = "/api/categories",
    params(("q" = Option<String>, Query, description = "Substring over the title")),
    responses((status = 200, description = "Categories with book counts", body = [Category]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CategoryQuery>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.category_repo.find_all().await?;
    Ok(Json(search_opt(categories, &["title"], query.q.as_deref())))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Title already taken")
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    AppJson(input): AppJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.category_repo.create(input.title).await?;
    tracing::info!("Category {} created: '{}'", category.id, category.title);
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Category>, ApiError> {
    state
        .category_repo
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| DomainError::not_found("category", id).into())
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category renamed", body = Category),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Title already taken")
    )
)]
pub async fn rename_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(input): AppJson<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_repo.rename(id, input.title).await?))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still assigned to books")
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Value>, ApiError> {
    state.category_repo.delete(id).await?;
    Ok(Json(json!({ "message": "Category deleted" })))
}
