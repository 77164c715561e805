//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.

use sea_orm::SqlErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed input, rejected before anything is written
    #[error("Validation error: {0}")]
    Validation(String),
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),
    /// Business rule refusal, e.g. loan cap reached or active punishment
    #[error("Eligibility denied: {0}")]
    EligibilityDenied(String),
    /// No copy left to lend
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),
    /// Blocked by a referential constraint
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Loan {0} is already returned")]
    AlreadyReturned(i32),
    /// A counter would leave its valid range. Signals a bug, never retried.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
}

impl DomainError {
    pub fn not_found(entity: &str, id: i32) -> Self {
        DomainError::NotFound(format!("{} {}", entity, id))
    }

    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::EligibilityDenied(_) => "eligibility_denied",
            DomainError::CapacityExceeded(_) => "capacity_exceeded",
            DomainError::Conflict(_) => "conflict",
            DomainError::AlreadyReturned(_) => "already_returned",
            DomainError::InvariantViolation(_) => "invariant_violation",
            DomainError::Database(_) => "internal_error",
        }
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        // A lost race on a UNIQUE column is a duplicate, not a server fault
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                DomainError::Conflict(format!("duplicate value ({})", detail))
            }
            _ => DomainError::Database(e.to_string()),
        }
    }
}
