//! Substring search used by every listing endpoint.
//!
//! Items expose named fields through [`Searchable`]; a query matches an item
//! when any of the requested fields contains it, ignoring case. Numbers match
//! on their decimal rendering. Results are recomputed from scratch on every
//! call and keep the input order.

use std::borrow::Cow;

/// A field value as seen by the search filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Cow<'a, str>),
    Integer(i64),
    Float(f64),
    /// Field is unknown or has no value; never matches.
    Absent,
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Text(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for FieldValue<'a> {
    fn from(value: &'a String) -> Self {
        FieldValue::Text(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for FieldValue<'_> {
    fn from(value: String) -> Self {
        FieldValue::Text(Cow::Owned(value))
    }
}

impl From<i32> for FieldValue<'_> {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<i64> for FieldValue<'_> {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl<'a, T> From<Option<T>> for FieldValue<'a>
where
    T: Into<FieldValue<'a>>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Absent)
    }
}

impl FieldValue<'_> {
    /// `needle` must already be lowercased.
    fn contains(&self, needle: &str) -> bool {
        match self {
            FieldValue::Text(text) => text.to_lowercase().contains(needle),
            FieldValue::Integer(n) => n.to_string().contains(needle),
            FieldValue::Float(n) => n.to_string().contains(needle),
            FieldValue::Absent => false,
        }
    }
}

pub trait Searchable {
    fn field(&self, name: &str) -> FieldValue<'_>;
}

/// Keep the items whose `fields` contain `query`, case-insensitively.
///
/// An empty query returns `items` untouched.
pub fn search<T: Searchable>(items: Vec<T>, fields: &[&str], query: &str) -> Vec<T> {
    if query.is_empty() {
        return items;
    }

    let needle = query.to_lowercase();
    items
        .into_iter()
        .filter(|item| fields.iter().any(|f| item.field(f).contains(&needle)))
        .collect()
}

/// Convenience for optional query-string parameters.
pub fn search_opt<T: Searchable>(items: Vec<T>, fields: &[&str], query: Option<&str>) -> Vec<T> {
    match query {
        Some(q) => search(items, fields, q),
        None => items,
    }
}
