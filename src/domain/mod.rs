//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no SeaORM, no Axum).
//! Only trait definitions, lending rules, and domain error types.

pub mod errors;
pub mod policy;
pub mod repositories;
pub mod types;

pub use errors::DomainError;
pub use policy::LoanPolicy;
pub use repositories::*;
pub use types::{LoanStatus, PunishmentKind, UserRole};
