//! Demo data for a fresh database. Everything goes through the services so
//! counters start out consistent.

use sea_orm::{EntityTrait, PaginatorTrait};

use crate::domain::{DomainError, NewAuthor, UserRole};
use crate::infrastructure::AppState;
use crate::models::book::NewBook;
use crate::models::loan::NewLoan;
use crate::models::user::{Entity as UserEntity, NewUser};
use crate::services::{catalog_service, loan_service, membership_service};

struct DemoBook {
    title: &'static str,
    author: (&'static str, &'static str),
    isbn: &'static str,
    edition: i32,
    copies: i32,
    category: &'static str,
    description: &'static str,
}

const CATEGORIES: &[&str] = &["Roman", "Bilim", "Tarih", "Felsefe"];

const BOOKS: &[DemoBook] = &[
    DemoBook {
        title: "1984",
        author: ("George", "Orwell"),
        isbn: "978-0451524935",
        edition: 5,
        copies: 3,
        category: "Roman",
        description: "Distopik bir gelecekte geçen, gözetim toplumu ve totaliter rejimi eleştiren bir başyapıt.",
    },
    DemoBook {
        title: "Suç ve Ceza",
        author: ("Fyodor", "Dostoyevski"),
        isbn: "978-0143058142",
        edition: 3,
        copies: 2,
        category: "Roman",
        description: "Psikolojik bir gerilim romanı. Suç, vicdan ve ahlak kavramlarını derinlemesine işleyen bir klasik.",
    },
    DemoBook {
        title: "Dönüşüm",
        author: ("Franz", "Kafka"),
        isbn: "978-1915098789",
        edition: 1,
        copies: 2,
        category: "Felsefe",
        description: "Bir sabah böceğe dönüşmüş olarak uyanan Gregor Samsa'nın hikayesi.",
    },
];

const USERS: &[(&str, &str, &str, UserRole)] = &[
    ("Ahmet", "Yılmaz", "ahmet@example.com", UserRole::User),
    ("Ayşe", "Kaya", "ayse@example.com", UserRole::Librarian),
    ("Mehmet", "Demir", "mehmet@example.com", UserRole::Admin),
];

/// Populate an empty database. Does nothing once any user exists.
pub async fn seed_demo_data(state: &AppState) -> Result<(), DomainError> {
    if UserEntity::find().count(state.db()).await? > 0 {
        tracing::info!("Database already has users, skipping demo data");
        return Ok(());
    }

    let mut category_ids = Vec::new();
    for title in CATEGORIES {
        let category = state.category_repo.create(title.to_string()).await?;
        category_ids.push((*title, category.id));
    }

    let mut book_ids = Vec::new();
    for demo in BOOKS {
        let author = state
            .author_repo
            .create(NewAuthor {
                first_name: demo.author.0.to_string(),
                second_name: demo.author.1.to_string(),
                bio: None,
                born: None,
            })
            .await?;

        let categories = category_ids
            .iter()
            .filter(|(title, _)| *title == demo.category)
            .map(|(_, id)| *id)
            .collect();

        let book = catalog_service::register_book(
            state,
            NewBook {
                title: demo.title.to_string(),
                isbn: demo.isbn.to_string(),
                author_id: Some(author.id),
                edition: demo.edition,
                description: Some(demo.description.to_string()),
                publish_year: None,
                total_copies: demo.copies,
                category_ids: categories,
            },
        )
        .await?;
        book_ids.push(book.id);
    }

    let mut user_ids = Vec::new();
    for (first_name, second_name, email, role) in USERS {
        let user = membership_service::register_user(
            state,
            NewUser {
                first_name: first_name.to_string(),
                second_name: second_name.to_string(),
                email: email.to_string(),
                role: *role,
                address: None,
                born: None,
            },
        )
        .await?;
        user_ids.push(user.id);
    }

    // Ahmet borrows 1984, Mehmet borrows Dönüşüm
    for (user_id, book_id) in [(user_ids[0], book_ids[0]), (user_ids[2], book_ids[2])] {
        loan_service::create_loan(
            state,
            NewLoan {
                user_id,
                book_id,
                duration_days: 14,
                notes: None,
            },
        )
        .await?;
    }

    tracing::info!(
        "Seeded {} categories, {} books, {} users",
        CATEGORIES.len(),
        BOOKS.len(),
        USERS.len()
    );
    Ok(())
}
