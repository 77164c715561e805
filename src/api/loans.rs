use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::api::{ApiError, AppJson, AppPath, AppQuery};
use crate::infrastructure::AppState;
use crate::models::LoanDto;
use crate::models::loan::NewLoan;
use crate::services::{LoanFilter, ReturnOutcome, loan_service};

#[utoipa::path(
    get,
    path = "/api/loans",
    params(
        ("status" = Option<String>, Query, description = "active, overdue or returned"),
        ("user_id" = Option<i32>, Query, description = "Only loans of this user"),
        ("book_id" = Option<i32>, Query, description = "Only loans of this book"),
        ("q" = Option<String>, Query, description = "Substring over book title and borrower name")
    ),
    responses((status = 200, description = "Loans, newest first"))
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<LoanFilter>,
) -> Result<Json<Value>, ApiError> {
    let loans = loan_service::list_loans(&state, filter).await?;
    Ok(Json(json!({
        "total": loans.len(),
        "loans": loans
    })))
}

#[utoipa::path(
    post,
    path = "/api/loans",
    request_body = NewLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDto),
        (status = 400, description = "Duration out of range"),
        (status = 403, description = "User may not borrow"),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "No copy available")
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AppJson(input): AppJson<NewLoan>,
) -> Result<(StatusCode, Json<LoanDto>), ApiError> {
    let loan = loan_service::create_loan(&state, input).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

#[utoipa::path(
    get,
    path = "/api/loans/{id}",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan", body = LoanDto),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<LoanDto>, ApiError> {
    Ok(Json(loan_service::get_loan(&state, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/loans/{id}",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan returned", body = ReturnOutcome),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<ReturnOutcome>, ApiError> {
    Ok(Json(loan_service::return_loan(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/loans/{id}/overdue",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Whether the loan is overdue right now"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_overdue(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Value>, ApiError> {
    let overdue = loan_service::is_overdue(&state, id).await?;
    Ok(Json(json!({ "loan_id": id, "is_overdue": overdue })))
}
