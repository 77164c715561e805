//! Services Layer
//!
//! Business operations over `AppState`, called by the HTTP handlers and
//! directly by tests.
#![allow(clippy::needless_update)] // SeaORM ActiveModels require ..Default::default()

pub mod catalog_service;
pub mod dashboard_service;
pub mod loan_service;
pub mod membership_service;
pub mod punishment_service;

pub use catalog_service::BookFilter;
pub use dashboard_service::DashboardStats;
pub use loan_service::{LoanFilter, ReturnOutcome};
pub use membership_service::{Eligibility, UserFilter, UserStats};
pub use punishment_service::PunishmentFilter;
