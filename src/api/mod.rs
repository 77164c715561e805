pub mod authors;
pub mod books;
pub mod categories;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod health;
pub mod loans;
pub mod punishments;
pub mod users;

pub use error::ApiError;
pub use extract::{AppJson, AppPath, AppQuery};

use axum::{Router, routing::get};

use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/books/:id/loans", get(books::list_book_loans))
        // Authors
        .route(
            "/authors",
            get(authors::list_authors).post(authors::create_author),
        )
        .route(
            "/authors/:id",
            get(authors::get_author).delete(authors::delete_author),
        )
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::rename_category)
                .delete(categories::delete_category),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/loans", get(users::list_user_loans))
        .route("/users/:id/eligibility", get(users::get_eligibility))
        .route("/users/:id/stats", get(users::get_user_stats))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route(
            "/loans/:id",
            get(loans::get_loan).put(loans::return_loan),
        )
        .route("/loans/:id/overdue", get(loans::get_overdue))
        // Punishments
        .route(
            "/punishments",
            get(punishments::list_punishments).post(punishments::create_punishment),
        )
        .route("/punishments/:id", get(punishments::get_punishment))
        // Dashboard
        .route("/dashboard", get(dashboard::get_dashboard))
        .with_state(state)
}
