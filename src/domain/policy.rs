//! Lending rules.

/// Maximum number of unreturned loans a user may hold at once.
pub const MAX_ACTIVE_LOANS: i32 = 5;
pub const MIN_LOAN_DAYS: i64 = 1;
pub const MAX_LOAN_DAYS: i64 = 30;
/// Users at or above this many open loans get a warning before borrowing.
pub const LOAN_WARNING_THRESHOLD: i32 = 3;
pub const MIN_PUNISHMENT_DAYS: i64 = 1;
pub const MAX_PUNISHMENT_DAYS: i64 = 365;
pub const MIN_PUNISHMENT_REASON_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPolicy {
    pub max_active_loans: i32,
    pub min_loan_days: i64,
    pub max_loan_days: i64,
    pub loan_warning_threshold: i32,
    pub min_punishment_days: i64,
    pub max_punishment_days: i64,
    pub min_punishment_reason_chars: usize,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_active_loans: MAX_ACTIVE_LOANS,
            min_loan_days: MIN_LOAN_DAYS,
            max_loan_days: MAX_LOAN_DAYS,
            loan_warning_threshold: LOAN_WARNING_THRESHOLD,
            min_punishment_days: MIN_PUNISHMENT_DAYS,
            max_punishment_days: MAX_PUNISHMENT_DAYS,
            min_punishment_reason_chars: MIN_PUNISHMENT_REASON_CHARS,
        }
    }
}

impl LoanPolicy {
    pub fn loan_duration_allowed(&self, days: i64) -> bool {
        (self.min_loan_days..=self.max_loan_days).contains(&days)
    }

    pub fn punishment_duration_allowed(&self, days: i64) -> bool {
        (self.min_punishment_days..=self.max_punishment_days).contains(&days)
    }
}
