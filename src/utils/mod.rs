pub mod clock;
pub mod dates;
pub mod search;

pub use clock::{Clock, ManualClock, SystemClock};
pub use search::{FieldValue, Searchable, search, search_opt};
