//! Per-entity write serialization.
//!
//! Every mutation of a book's copy counts or a user's loan counters holds the
//! matching lock for the length of its transaction. Callers that need both
//! must take the book lock first, then the user lock, and must do so before
//! opening a database transaction.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct EntityLocks {
    books: DashMap<i32, Arc<Mutex<()>>>,
    users: DashMap<i32, Arc<Mutex<()>>>,
}

/// Guards held for one book/user pair; released on drop.
pub struct LoanGuard {
    _book: OwnedMutexGuard<()>,
    _user: OwnedMutexGuard<()>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_book(&self, book_id: i32) -> OwnedMutexGuard<()> {
        Self::acquire(&self.books, book_id).await
    }

    pub async fn lock_user(&self, user_id: i32) -> OwnedMutexGuard<()> {
        Self::acquire(&self.users, user_id).await
    }

    /// Lock a book and a user in the canonical order.
    pub async fn lock_loan(&self, book_id: i32, user_id: i32) -> LoanGuard {
        let book = self.lock_book(book_id).await;
        let user = self.lock_user(user_id).await;
        LoanGuard {
            _book: book,
            _user: user,
        }
    }

    /// Drop the book's entry once the row is gone.
    pub fn forget_book(&self, book_id: i32) {
        self.books.remove(&book_id);
    }

    pub fn forget_user(&self, user_id: i32) {
        self.users.remove(&user_id);
    }

    /// Number of book and user entries currently registered.
    pub fn tracked(&self) -> usize {
        self.books.len() + self.users.len()
    }

    async fn acquire(map: &DashMap<i32, Arc<Mutex<()>>>, id: i32) -> OwnedMutexGuard<()> {
        // The shard guard must be released before awaiting.
        let mutex = map.entry(id).or_default().clone();
        mutex.lock_owned().await
    }
}
