//! SQLite-backed stores, one module per entity. All functions are free
//! async fns over [`Db`]; each runs a single `with_connection` closure.
//! The traversal engine only ever reads through these stores.

pub mod branch;
pub mod event;
pub mod media;
pub mod person;
pub mod relationship;
pub mod user;

/// Build a `?,?,...` placeholder list for an IN clause.
pub(crate) fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(",")
}

/// Wrap an enum-parse failure into a rusqlite conversion error so row
/// mappers can use `?` directly.
pub(crate) fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

/// Current timestamp in the RFC3339 form all tables store.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
