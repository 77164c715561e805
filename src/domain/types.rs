//! Enumerations stored as text columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Librarian,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Librarian => "librarian",
            UserRole::User => "user",
        }
    }

    /// Staff may sanction other users.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Librarian)
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "librarian" => Ok(UserRole::Librarian),
            "user" => Ok(UserRole::User),
            other => Err(DomainError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan state. Always derived from timestamps, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
        }
    }
}

impl FromStr for LoanStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LoanStatus::Active),
            "overdue" => Ok(LoanStatus::Overdue),
            "returned" => Ok(LoanStatus::Returned),
            other => Err(DomainError::Validation(format!(
                "unknown loan status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PunishmentKind {
    LateReturn,
    DamagedBook,
    LostBook,
    Violation,
}

impl PunishmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunishmentKind::LateReturn => "late_return",
            PunishmentKind::DamagedBook => "damaged_book",
            PunishmentKind::LostBook => "lost_book",
            PunishmentKind::Violation => "violation",
        }
    }
}

impl FromStr for PunishmentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "late_return" => Ok(PunishmentKind::LateReturn),
            "damaged_book" => Ok(PunishmentKind::DamagedBook),
            "lost_book" => Ok(PunishmentKind::LostBook),
            "violation" => Ok(PunishmentKind::Violation),
            other => Err(DomainError::Validation(format!(
                "unknown punishment kind '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        for role in [UserRole::Admin, UserRole::Librarian, UserRole::User] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_only_admins_and_librarians_are_staff() {
        assert!(UserRole::Admin.is_staff());
        assert!(UserRole::Librarian.is_staff());
        assert!(!UserRole::User.is_staff());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&PunishmentKind::DamagedBook).unwrap();
        assert_eq!(json, "\"damaged_book\"");
        let status: LoanStatus = serde_json::from_str("\"overdue\"").unwrap();
        assert_eq!(status, LoanStatus::Overdue);
    }
}
