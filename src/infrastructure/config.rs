use std::env;

use crate::domain::LoanPolicy;
use crate::domain::policy::{MAX_ACTIVE_LOANS, MAX_LOAN_DAYS};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub profile: String,
    pub max_active_loans: i32,
    pub max_loan_days: i64,
}

impl Config {
    pub fn from_env() -> Self {
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());
        Self::for_profile(profile)
    }

    /// Same as `from_env`, with the profile forced (e.g. from `--profile`).
    pub fn for_profile(profile: String) -> Self {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            if profile == "default" {
                "sqlite://library_desk.db?mode=rwc".to_string()
            } else {
                format!("sqlite://library_desk_{}.db?mode=rwc", profile)
            }
        });

        Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            max_active_loans: env::var("MAX_ACTIVE_LOANS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(MAX_ACTIVE_LOANS),
            max_loan_days: env::var("MAX_LOAN_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(MAX_LOAN_DAYS),
            profile,
        }
    }

    pub fn loan_policy(&self) -> LoanPolicy {
        LoanPolicy {
            max_active_loans: self.max_active_loans,
            max_loan_days: self.max_loan_days,
            ..LoanPolicy::default()
        }
    }
}
