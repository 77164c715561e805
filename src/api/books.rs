use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::api::{ApiError, AppJson, AppPath, AppQuery};
use crate::infrastructure::AppState;
use crate::models::Book;
use crate::models::book::{BookPatch, NewBook};
use crate::services::{BookFilter, catalog_service};

#[utoipa::path(
    get,
    path = "/api/books",
    params(
        ("q" = Option<String>, Query, description = "Substring over title, author, isbn, category, edition"),
        ("category_id" = Option<i32>, Query, description = "Only books in this category"),
        ("author_id" = Option<i32>, Query, description = "Only books by this author"),
        ("available" = Option<bool>, Query, description = "true: a copy is on the shelf, false: all copies out")
    ),
    responses(
        (status = 200, description = "List of books")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<BookFilter>,
) -> Result<Json<Value>, ApiError> {
    let books = catalog_service::list_books(&state, filter).await?;

    Ok(Json(json!({
        "total": books.len(),
        "books": books
    })))
}

#[utoipa::path(
    post,
    path = "/api/books",
    request_body = NewBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AppJson(input): AppJson<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = catalog_service::register_book(&state, input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(catalog_service::get_book(&state, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/books/{id}",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found"),
        (status = 409, description = "New total below copies on loan")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(patch): AppJson<BookPatch>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(catalog_service::update_book(&state, id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has unreturned loans")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Value>, ApiError> {
    catalog_service::remove_book(&state, id).await?;
    Ok(Json(json!({ "message": "Book deleted successfully" })))
}

#[utoipa::path(
    get,
    path = "/api/books/{id}/loans",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Borrow history, newest first"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn list_book_loans(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Value>, ApiError> {
    let loans = catalog_service::book_loans(&state, id).await?;
    Ok(Json(json!({
        "total": loans.len(),
        "loans": loans
    })))
}
