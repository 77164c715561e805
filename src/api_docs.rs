use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::books::list_books,
        api::books::create_book,
        api::books::get_book,
        api::books::update_book,
        api::books::delete_book,
        api::books::list_book_loans,
        api::authors::list_authors,
        api::authors::create_author,
        api::authors::get_author,
        api::authors::delete_author,
        api::categories::list_categories,
        api::categories::create_category,
        api::categories::get_category,
        api::categories::rename_category,
        api::categories::delete_category,
        api::users::list_users,
        api::users::create_user,
        api::users::get_user,
        api::users::update_user,
        api::users::delete_user,
        api::users::list_user_loans,
        api::users::get_eligibility,
        api::users::get_user_stats,
        api::loans::list_loans,
        api::loans::create_loan,
        api::loans::get_loan,
        api::loans::return_loan,
        api::loans::get_overdue,
        api::punishments::list_punishments,
        api::punishments::create_punishment,
        api::punishments::get_punishment,
        api::dashboard::get_dashboard,
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::book::NewBook,
            crate::models::User,
            crate::models::user::NewUser,
            crate::models::LoanDto,
            crate::models::loan::NewLoan,
            crate::models::PunishmentDto,
            crate::models::punishment::NewPunishment,
            crate::domain::Author,
            crate::domain::NewAuthor,
            crate::domain::Category,
            crate::domain::UserRole,
            crate::domain::LoanStatus,
            crate::domain::PunishmentKind,
            crate::api::categories::CategoryRequest,
            crate::services::Eligibility,
            crate::services::UserStats,
            crate::services::ReturnOutcome,
            crate::services::DashboardStats,
            crate::services::dashboard_service::CategoryHighlight,
        )
    ),
    tags(
        (name = "library-desk", description = "Library loan desk API")
    )
)]
pub struct ApiDoc;
