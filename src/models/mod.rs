pub mod author;
pub mod book;
pub mod book_categories;
pub mod category;
pub mod loan;
pub mod punishment;
pub mod user;

pub use book::Book;
pub use loan::LoanDto;
pub use punishment::PunishmentDto;
pub use user::User;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
