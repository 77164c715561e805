use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::api::{ApiError, AppJson, AppPath};
use crate::domain::{Author, DomainError, NewAuthor};
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/authors",
    responses((status = 200, description = "List of authors", body = [Author]))
)]
pub async fn list_authors(State(state): State<AppState>) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.author_repo.find_all().await?))
}

#[utoipa::path(
    post,
    path = "/api/authors",
    request_body = NewAuthor,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    AppJson(input): AppJson<NewAuthor>,
) -> Result<(StatusCode, Json<Author>), ApiError> {
    let author = state.author_repo.create(input).await?;
    tracing::info!("Author {} created", author.id);
    Ok((StatusCode::CREATED, Json(author)))
}

#[utoipa::path(
    get,
    path = "/api/authors/{id}",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Author>, ApiError> {
    state
        .author_repo
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| DomainError::not_found("author", id).into())
}

#[utoipa::path(
    delete,
    path = "/api/authors/{id}",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author deleted"),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Author still has books")
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Value>, ApiError> {
    state.author_repo.delete(id).await?;
    Ok(Json(json!({ "message": "Author deleted" })))
}
