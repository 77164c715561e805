//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{AuthorRepository, CategoryRepository, LoanPolicy};
use crate::infrastructure::locks::EntityLocks;
use crate::infrastructure::{SeaOrmAuthorRepository, SeaOrmCategoryRepository};
use crate::utils::{Clock, SystemClock};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
    locks: Arc<EntityLocks>,
    policy: LoanPolicy,
    /// Author repository
    pub author_repo: Arc<dyn AuthorRepository>,
    /// Category repository
    pub category_repo: Arc<dyn CategoryRepository>,
}

impl AppState {
    /// Create a new AppState on the system clock with the default lending rules
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        let author_repo = Arc::new(SeaOrmAuthorRepository::new(db.clone(), clock.clone()));
        let category_repo = Arc::new(SeaOrmCategoryRepository::new(db.clone(), clock.clone()));

        Self {
            db,
            clock,
            locks: Arc::new(EntityLocks::new()),
            policy: LoanPolicy::default(),
            author_repo,
            category_repo,
        }
    }

    pub fn with_policy(mut self, policy: LoanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn locks(&self) -> &EntityLocks {
        &self.locks
    }

    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }
}
