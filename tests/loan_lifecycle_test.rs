use chrono::{DateTime, Duration, TimeZone, Utc};
use library_desk::db;
use library_desk::domain::{DomainError, LoanStatus, NewAuthor, PunishmentKind, UserRole};
use library_desk::infrastructure::AppState;
use library_desk::models::book::{BookPatch, NewBook};
use library_desk::models::{author, category};
use library_desk::models::loan::NewLoan;
use library_desk::models::punishment::{self, NewPunishment};
use library_desk::models::user::NewUser;
use library_desk::services::{
    LoanFilter, catalog_service, dashboard_service, loan_service, membership_service,
    punishment_service,
};
use library_desk::utils::ManualClock;
use sea_orm::EntityTrait;
use std::sync::Arc;

fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap()
}

// Helper to create a test state on a clock we control
async fn setup_test_state() -> (AppState, Arc<ManualClock>) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let clock = Arc::new(ManualClock::new(jan(1)));
    (AppState::with_clock(db, clock.clone()), clock)
}

async fn create_test_book(state: &AppState, title: &str, copies: i32) -> i32 {
    catalog_service::register_book(
        state,
        NewBook {
            title: title.to_string(),
            isbn: format!("978-{}", title.len()),
            author_id: None,
            edition: 1,
            description: None,
            publish_year: None,
            total_copies: copies,
            category_ids: vec![],
        },
    )
    .await
    .expect("Failed to create book")
    .id
}

async fn create_test_user(state: &AppState, name: &str, role: UserRole) -> i32 {
    membership_service::register_user(
        state,
        NewUser {
            first_name: name.to_string(),
            second_name: "Test".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
            address: None,
            born: None,
        },
    )
    .await
    .expect("Failed to create user")
    .id
}

async fn borrow(state: &AppState, user_id: i32, book_id: i32, days: i64) -> Result<i32, DomainError> {
    loan_service::create_loan(
        state,
        NewLoan {
            user_id,
            book_id,
            duration_days: days,
            notes: None,
        },
    )
    .await
    .map(|loan| loan.id)
}

async fn punish(state: &AppState, user_id: i32, punisher_id: i32, days: i64) -> Result<i32, DomainError> {
    punishment_service::apply_punishment(
        state,
        NewPunishment {
            user_id,
            punisher_id,
            kind: PunishmentKind::LateReturn,
            reason: "Returned the book three weeks late".to_string(),
            duration_days: days,
            loan_id: None,
        },
    )
    .await
    .map(|p| p.id)
}

#[tokio::test]
async fn test_loan_round_trip_restores_counters() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 3).await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;

    let loan_id = borrow(&state, user_id, book_id, 14).await.unwrap();

    let book = catalog_service::get_book(&state, book_id).await.unwrap();
    assert_eq!(book.available_copies, 2);
    assert_eq!(book.loaned_copies, 1);
    let user = membership_service::get_user(&state, user_id).await.unwrap();
    assert_eq!(user.active_loans, 1);
    assert_eq!(user.total_loans, 1);

    let outcome = loan_service::return_loan(&state, loan_id).await.unwrap();
    assert!(!outcome.was_overdue);
    assert_eq!(outcome.loan.status, LoanStatus::Returned);

    let book = catalog_service::get_book(&state, book_id).await.unwrap();
    assert_eq!(book.available_copies, 3);
    assert_eq!(book.status, "available");
    assert_eq!(book.borrow_count, 1);
    let user = membership_service::get_user(&state, user_id).await.unwrap();
    assert_eq!(user.active_loans, 0);
    assert_eq!(user.total_loans, 1);
}

#[tokio::test]
async fn test_overdue_follows_the_clock() {
    let (state, clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "Dönüşüm", 1).await;
    let user_id = create_test_user(&state, "Mehmet", UserRole::User).await;

    let loan_id = borrow(&state, user_id, book_id, 14).await.unwrap();
    let loan = loan_service::get_loan(&state, loan_id).await.unwrap();
    assert_eq!(loan.ended_at, jan(15));
    assert_eq!(loan.status, LoanStatus::Active);

    clock.set(jan(15));
    assert!(!loan_service::is_overdue(&state, loan_id).await.unwrap());

    clock.set(jan(16));
    assert!(loan_service::is_overdue(&state, loan_id).await.unwrap());
    let loan = loan_service::get_loan(&state, loan_id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Overdue);
    assert_eq!(loan.days_overdue, 1);

    let outcome = loan_service::return_loan(&state, loan_id).await.unwrap();
    assert!(outcome.was_overdue);

    clock.advance(Duration::days(30));
    assert!(!loan_service::is_overdue(&state, loan_id).await.unwrap());
}

#[tokio::test]
async fn test_second_return_is_refused() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "Suç ve Ceza", 1).await;
    let user_id = create_test_user(&state, "Ayse", UserRole::User).await;
    let loan_id = borrow(&state, user_id, book_id, 7).await.unwrap();

    loan_service::return_loan(&state, loan_id).await.unwrap();
    let second = loan_service::return_loan(&state, loan_id).await;
    assert!(matches!(second, Err(DomainError::AlreadyReturned(id)) if id == loan_id));

    // Counters were moved exactly once
    let book = catalog_service::get_book(&state, book_id).await.unwrap();
    assert_eq!(book.available_copies, 1);
    let user = membership_service::get_user(&state, user_id).await.unwrap();
    assert_eq!(user.active_loans, 0);
}

#[tokio::test]
async fn test_missing_loan_is_not_found() {
    let (state, _clock) = setup_test_state().await;
    assert!(matches!(
        loan_service::return_loan(&state, 42).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(matches!(
        loan_service::is_overdue(&state, 42).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_user_at_cap_is_denied_even_with_copies() {
    let (state, _clock) = setup_test_state().await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;

    for i in 0..5 {
        let book_id = create_test_book(&state, &format!("Book {}", i), 1).await;
        borrow(&state, user_id, book_id, 10).await.unwrap();
    }

    let spare = create_test_book(&state, "Spare", 4).await;
    let refused = borrow(&state, user_id, spare, 10).await;
    assert!(matches!(refused, Err(DomainError::EligibilityDenied(_))));

    let eligibility = membership_service::eligibility(&state, user_id).await.unwrap();
    assert!(!eligibility.can_borrow);
    assert_eq!(eligibility.remaining, 0);
    assert!(!membership_service::can_borrow(&state, user_id).await.unwrap());

    let book = catalog_service::get_book(&state, spare).await.unwrap();
    assert_eq!(book.available_copies, 4);
}

#[tokio::test]
async fn test_eligibility_is_checked_before_capacity() {
    let (state, _clock) = setup_test_state().await;
    let reader = create_test_user(&state, "Reader", UserRole::User).await;
    let capped = create_test_user(&state, "Capped", UserRole::User).await;

    let scarce = create_test_book(&state, "Scarce", 1).await;
    borrow(&state, reader, scarce, 10).await.unwrap();

    for i in 0..5 {
        let book_id = create_test_book(&state, &format!("Other {}", i), 1).await;
        borrow(&state, capped, book_id, 10).await.unwrap();
    }

    // No copies left and the user is capped: the cap wins
    let refused = borrow(&state, capped, scarce, 10).await;
    assert!(matches!(refused, Err(DomainError::EligibilityDenied(_))));

    let third = create_test_user(&state, "Third", UserRole::User).await;
    let refused = borrow(&state, third, scarce, 10).await;
    assert!(matches!(refused, Err(DomainError::CapacityExceeded(_))));
}

#[tokio::test]
async fn test_warning_near_the_cap() {
    let (state, _clock) = setup_test_state().await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;

    for i in 0..3 {
        let book_id = create_test_book(&state, &format!("Book {}", i), 1).await;
        borrow(&state, user_id, book_id, 10).await.unwrap();
    }

    let eligibility = membership_service::eligibility(&state, user_id).await.unwrap();
    assert!(eligibility.can_borrow);
    assert_eq!(eligibility.remaining, 2);
    assert!(eligibility.warning.is_some());
}

#[tokio::test]
async fn test_duration_out_of_range_changes_nothing() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 1).await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;

    for days in [0, 31, -3] {
        let result = borrow(&state, user_id, book_id, days).await;
        assert!(matches!(result, Err(DomainError::Validation(_))), "{} days", days);
    }

    let book = catalog_service::get_book(&state, book_id).await.unwrap();
    assert_eq!(book.available_copies, 1);
    let user = membership_service::get_user(&state, user_id).await.unwrap();
    assert_eq!(user.total_loans, 0);
}

#[tokio::test]
async fn test_unknown_user_or_book_is_not_found() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 1).await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;

    assert!(matches!(borrow(&state, 999, book_id, 7).await, Err(DomainError::NotFound(_))));
    assert!(matches!(borrow(&state, user_id, 999, 7).await, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_active_punishment_blocks_borrowing_until_it_ends() {
    let (state, clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 2).await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;
    let librarian = create_test_user(&state, "Ayse", UserRole::Librarian).await;

    punish(&state, user_id, librarian, 3).await.unwrap();

    let refused = borrow(&state, user_id, book_id, 7).await;
    assert!(matches!(refused, Err(DomainError::EligibilityDenied(_))));

    let active = punishment_service::list_punishments(
        &state,
        library_desk::services::PunishmentFilter {
            user_id: Some(user_id),
            active: Some(true),
        },
    )
    .await
    .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].remaining_days, 3);

    // Active iff now < ends_at
    clock.set(jan(4));
    assert!(borrow(&state, user_id, book_id, 7).await.is_ok());
}

#[tokio::test]
async fn test_punishment_rules() {
    let (state, _clock) = setup_test_state().await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;
    let other = create_test_user(&state, "Veli", UserRole::User).await;
    let admin = create_test_user(&state, "Mehmet", UserRole::Admin).await;

    let short_reason = punishment_service::apply_punishment(
        &state,
        NewPunishment {
            user_id,
            punisher_id: admin,
            kind: PunishmentKind::Violation,
            reason: "  late    ".to_string(),
            duration_days: 5,
            loan_id: None,
        },
    )
    .await;
    assert!(matches!(short_reason, Err(DomainError::Validation(_))));

    assert!(matches!(punish(&state, user_id, admin, 0).await, Err(DomainError::Validation(_))));
    assert!(matches!(punish(&state, user_id, admin, 366).await, Err(DomainError::Validation(_))));
    assert!(matches!(punish(&state, admin, admin, 5).await, Err(DomainError::Validation(_))));
    assert!(matches!(
        punish(&state, user_id, other, 5).await,
        Err(DomainError::EligibilityDenied(_))
    ));
    assert!(matches!(punish(&state, 999, admin, 5).await, Err(DomainError::NotFound(_))));

    let id = punish(&state, user_id, admin, 365).await.unwrap();
    let stored = punishment_service::get_punishment(&state, id).await.unwrap();
    assert_eq!(stored.ends_at, jan(1) + Duration::days(365));
    assert!(stored.is_active);
}

#[tokio::test]
async fn test_punishment_loan_must_belong_to_user() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 2).await;
    let ahmet = create_test_user(&state, "Ahmet", UserRole::User).await;
    let veli = create_test_user(&state, "Veli", UserRole::User).await;
    let admin = create_test_user(&state, "Mehmet", UserRole::Admin).await;
    let loan_id = borrow(&state, ahmet, book_id, 7).await.unwrap();

    let wrong_user = punishment_service::apply_punishment(
        &state,
        NewPunishment {
            user_id: veli,
            punisher_id: admin,
            kind: PunishmentKind::DamagedBook,
            reason: "Pages torn out of chapter two".to_string(),
            duration_days: 10,
            loan_id: Some(loan_id),
        },
    )
    .await;
    assert!(matches!(wrong_user, Err(DomainError::Validation(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_loans_never_oversell() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 2).await;

    let mut users = Vec::new();
    for i in 0..6 {
        users.push(create_test_user(&state, &format!("Reader{}", i), UserRole::User).await);
    }

    let attempts = users.iter().map(|user_id| {
        let state = state.clone();
        let user_id = *user_id;
        tokio::spawn(async move { borrow(&state, user_id, book_id, 14).await })
    });
    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let granted = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(DomainError::CapacityExceeded(_))))
        .count();
    assert_eq!(granted, 2);
    assert_eq!(refused, 4);

    let book = catalog_service::get_book(&state, book_id).await.unwrap();
    assert_eq!(book.available_copies, 0);
    assert_eq!(book.status, "borrowed");
}

#[tokio::test]
async fn test_concurrent_returns_close_the_loan_once() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 1).await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;
    let loan_id = borrow(&state, user_id, book_id, 14).await.unwrap();

    let results = futures::future::join_all(
        (0..4).map(|_| loan_service::return_loan(&state, loan_id)),
    )
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::AlreadyReturned(_))))
            .count(),
        3
    );
    let book = catalog_service::get_book(&state, book_id).await.unwrap();
    assert_eq!(book.available_copies, 1);
}

#[tokio::test]
async fn test_remove_book_blocked_while_on_loan() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 1).await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;
    let admin = create_test_user(&state, "Mehmet", UserRole::Admin).await;
    let loan_id = borrow(&state, user_id, book_id, 14).await.unwrap();

    let blocked = catalog_service::remove_book(&state, book_id).await;
    assert!(matches!(blocked, Err(DomainError::Conflict(_))));

    loan_service::return_loan(&state, loan_id).await.unwrap();
    let punishment_id = punishment_service::apply_punishment(
        &state,
        NewPunishment {
            user_id,
            punisher_id: admin,
            kind: PunishmentKind::DamagedBook,
            reason: "Coffee stains across the cover".to_string(),
            duration_days: 2,
            loan_id: Some(loan_id),
        },
    )
    .await
    .unwrap()
    .id;

    catalog_service::remove_book(&state, book_id).await.unwrap();
    assert!(matches!(
        catalog_service::get_book(&state, book_id).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(matches!(
        loan_service::get_loan(&state, loan_id).await,
        Err(DomainError::NotFound(_))
    ));

    // The punishment survives, detached from the deleted loan
    let stored = punishment::Entity::find_by_id(punishment_id)
        .one(state.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.loan_id, None);
}

#[tokio::test]
async fn test_total_copies_cannot_drop_below_loaned() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 3).await;
    let a = create_test_user(&state, "Ahmet", UserRole::User).await;
    let b = create_test_user(&state, "Ayse", UserRole::User).await;
    borrow(&state, a, book_id, 7).await.unwrap();
    borrow(&state, b, book_id, 7).await.unwrap();

    let shrink = |total| BookPatch {
        total_copies: Some(total),
        ..Default::default()
    };

    let too_small = catalog_service::update_book(&state, book_id, shrink(1)).await;
    assert!(matches!(too_small, Err(DomainError::Conflict(_))));
    let zero = catalog_service::update_book(&state, book_id, shrink(0)).await;
    assert!(matches!(zero, Err(DomainError::Validation(_))));

    let book = catalog_service::update_book(&state, book_id, shrink(2)).await.unwrap();
    assert_eq!(book.total_copies, 2);
    assert_eq!(book.available_copies, 0);

    let book = catalog_service::update_book(&state, book_id, shrink(5)).await.unwrap();
    assert_eq!(book.available_copies, 3);
}

#[tokio::test]
async fn test_category_delete_blocked_while_assigned() {
    let (state, _clock) = setup_test_state().await;
    let roman = state.category_repo.create("Roman".to_string()).await.unwrap();

    let book = catalog_service::register_book(
        &state,
        NewBook {
            title: "Suç ve Ceza".to_string(),
            isbn: "978-0143058142".to_string(),
            author_id: None,
            edition: 3,
            description: None,
            publish_year: None,
            total_copies: 1,
            category_ids: vec![roman.id],
        },
    )
    .await
    .unwrap();
    assert_eq!(book.categories, vec!["Roman".to_string()]);

    let duplicate = state.category_repo.create("Roman".to_string()).await;
    assert!(matches!(duplicate, Err(DomainError::Conflict(_))));

    let blocked = state.category_repo.delete(roman.id).await;
    assert!(matches!(blocked, Err(DomainError::Conflict(_))));

    catalog_service::remove_book(&state, book.id).await.unwrap();
    state.category_repo.delete(roman.id).await.unwrap();
}

#[tokio::test]
async fn test_register_book_validation() {
    let (state, _clock) = setup_test_state().await;
    let base = NewBook {
        title: "1984".to_string(),
        isbn: "978-0451524935".to_string(),
        author_id: None,
        edition: 1,
        description: None,
        publish_year: None,
        total_copies: 1,
        category_ids: vec![],
    };

    let cases = [
        NewBook { title: "   ".into(), ..base.clone() },
        NewBook { isbn: "".into(), ..base.clone() },
        NewBook { total_copies: 0, ..base.clone() },
        NewBook { edition: 0, ..base.clone() },
        NewBook { author_id: Some(77), ..base.clone() },
        NewBook { category_ids: vec![5], ..base.clone() },
    ];
    for case in cases {
        let result = catalog_service::register_book(&state, case).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    let book = catalog_service::register_book(&state, base).await.unwrap();
    assert_eq!(book.available_copies, book.total_copies);
}

#[tokio::test]
async fn test_email_is_unique_ignoring_case() {
    let (state, _clock) = setup_test_state().await;
    create_test_user(&state, "Ahmet", UserRole::User).await;

    let duplicate = membership_service::register_user(
        &state,
        NewUser {
            first_name: "Another".to_string(),
            second_name: "Ahmet".to_string(),
            email: "AHMET@Example.com".to_string(),
            role: UserRole::User,
            address: None,
            born: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn test_remove_user_rules() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 1).await;
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;
    let admin = create_test_user(&state, "Mehmet", UserRole::Admin).await;
    let loan_id = borrow(&state, user_id, book_id, 7).await.unwrap();

    let blocked = membership_service::remove_user(&state, user_id).await;
    assert!(matches!(blocked, Err(DomainError::Conflict(_))));

    loan_service::return_loan(&state, loan_id).await.unwrap();
    punish(&state, user_id, admin, 5).await.unwrap();

    // Admin issued a punishment, so they stay
    let blocked = membership_service::remove_user(&state, admin).await;
    assert!(matches!(blocked, Err(DomainError::Conflict(_))));

    membership_service::remove_user(&state, user_id).await.unwrap();
    assert!(matches!(
        membership_service::get_user(&state, user_id).await,
        Err(DomainError::NotFound(_))
    ));

    let book = catalog_service::get_book(&state, book_id).await.unwrap();
    assert_eq!(book.borrow_count, 0);
    membership_service::remove_user(&state, admin).await.unwrap();
}

#[tokio::test]
async fn test_user_stats_and_history() {
    let (state, clock) = setup_test_state().await;
    let roman = state.category_repo.create("Roman".to_string()).await.unwrap();
    let book = catalog_service::register_book(
        &state,
        NewBook {
            title: "1984".to_string(),
            isbn: "978-0451524935".to_string(),
            author_id: None,
            edition: 5,
            description: None,
            publish_year: None,
            total_copies: 2,
            category_ids: vec![roman.id],
        },
    )
    .await
    .unwrap();
    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;

    let on_time = borrow(&state, user_id, book.id, 5).await.unwrap();
    clock.set(jan(4));
    loan_service::return_loan(&state, on_time).await.unwrap();

    let late = borrow(&state, user_id, book.id, 2).await.unwrap();
    clock.set(jan(10));
    loan_service::return_loan(&state, late).await.unwrap();

    let stats = membership_service::user_stats(&state, user_id).await.unwrap();
    assert_eq!(stats.on_time_returns, 1);
    assert_eq!(stats.late_returns, 1);
    assert_eq!(stats.total_borrow_days, 3 + 6);
    assert_eq!(stats.favorite_category.as_deref(), Some("Roman"));

    let history = membership_service::user_loans(&state, user_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, late);

    let returned = loan_service::list_loans(
        &state,
        LoanFilter {
            status: Some(LoanStatus::Returned),
            q: Some("ahmet".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(returned.len(), 2);
}

#[tokio::test]
async fn test_dashboard_counts() {
    let (state, clock) = setup_test_state().await;
    let a = create_test_book(&state, "1984", 2).await;
    let b = create_test_book(&state, "Dönüşüm", 1).await;
    let reader = create_test_user(&state, "Ahmet", UserRole::User).await;
    let admin = create_test_user(&state, "Mehmet", UserRole::Admin).await;

    borrow(&state, reader, a, 3).await.unwrap();
    borrow(&state, reader, b, 20).await.unwrap();
    clock.set(jan(5));
    punish(&state, reader, admin, 10).await.unwrap();

    let stats = dashboard_service::dashboard_stats(&state).await.unwrap();
    assert_eq!(stats.total_books, 2);
    assert_eq!(stats.total_copies, 3);
    assert_eq!(stats.available_copies, 1);
    assert_eq!(stats.loaned_copies, 2);
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.users_with_loans, 1);
    assert_eq!(stats.punished_users, 1);
    assert_eq!(stats.active_loans, 1);
    assert_eq!(stats.overdue_loans, 1);
    assert_eq!(stats.recent_loans.len(), 2);
    assert!(stats.most_populated_category.is_none());
}

#[tokio::test]
async fn test_concurrent_duplicate_registrations_conflict() {
    let (state, _clock) = setup_test_state().await;
    let input = NewUser {
        first_name: "Ayşe".to_string(),
        second_name: "Yılmaz".to_string(),
        email: "dup@example.com".to_string(),
        role: UserRole::User,
        address: None,
        born: None,
    };

    let (a, b) = tokio::join!(
        membership_service::register_user(&state, input.clone()),
        membership_service::register_user(&state, input)
    );
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(DomainError::Conflict(_))))
    );

    let (a, b) = tokio::join!(
        state.category_repo.create("Roman".to_string()),
        state.category_repo.create("Roman".to_string())
    );
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(DomainError::Conflict(_))))
    );
}

#[tokio::test]
async fn test_unknown_ids_leave_no_lock_entries() {
    let (state, _clock) = setup_test_state().await;
    let book_id = create_test_book(&state, "1984", 1).await;

    for id in 1000..1100 {
        let result = borrow(&state, id, id, 7).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
        let result = borrow(&state, id, book_id, 7).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }
    let updated = catalog_service::update_book(&state, 999, BookPatch::default()).await;
    assert!(matches!(updated, Err(DomainError::NotFound(_))));
    let removed = catalog_service::remove_book(&state, 999).await;
    assert!(matches!(removed, Err(DomainError::NotFound(_))));
    let removed = membership_service::remove_user(&state, 999).await;
    assert!(matches!(removed, Err(DomainError::NotFound(_))));
    assert_eq!(state.locks().tracked(), 0);

    let user_id = create_test_user(&state, "Ahmet", UserRole::User).await;
    borrow(&state, user_id, book_id, 7).await.unwrap();
    assert_eq!(state.locks().tracked(), 2);
}

#[tokio::test]
async fn test_reference_data_timestamps_follow_the_clock() {
    let (state, clock) = setup_test_state().await;
    let roman = state.category_repo.create("Roman".to_string()).await.unwrap();

    clock.advance(Duration::days(3));
    state
        .category_repo
        .rename(roman.id, "Klasik Roman".to_string())
        .await
        .unwrap();

    let stored = category::Entity::find_by_id(roman.id)
        .one(state.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.created_at, jan(1));
    assert_eq!(stored.updated_at, jan(4));

    let author = state
        .author_repo
        .create(NewAuthor {
            first_name: "Fyodor".to_string(),
            second_name: "Dostoyevski".to_string(),
            bio: None,
            born: None,
        })
        .await
        .unwrap();
    let stored = author::Entity::find_by_id(author.id)
        .one(state.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.created_at, jan(4));
}
