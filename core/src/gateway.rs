//! # Gateways
//!
//! The storage seam between HTTP handlers and the database. Each resource
//! (patients, staff, appointments, ...) implements [`Gateway`] once against
//! PostgreSQL; handlers are written generically over the trait.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, AppResult};
use crate::pagination::{ListQuery, Page};

/// CRUD access to one resource.
///
/// Implementations are synchronous; callers on an async runtime are expected
/// to move calls onto a blocking thread.
pub trait Gateway: Send + Sync + 'static {
    /// Record as returned to clients, including joined display names.
    type View: Serialize + Send + 'static;
    /// Payload accepted on create.
    type New: DeserializeOwned + Send + 'static;
    /// Partial payload accepted on update. Absent fields are left unchanged.
    type Changes: DeserializeOwned + Send + 'static;
    /// Resource-specific listing filters read from the query string.
    type Filter: DeserializeOwned + Default + Send + 'static;

    /// Singular display name, e.g. `Patient`.
    const NAME: &'static str;

    /// Plural used in messages, e.g. `patients`.
    const PLURAL: &'static str;

    /// Returns one page of records, optionally narrowed by a search term.
    fn list(&self, query: &ListQuery, filter: &Self::Filter) -> AppResult<Page<Self::View>>;

    /// Returns the record with the given id.
    fn get(&self, id: i32) -> AppResult<Self::View>;

    /// Inserts a record and returns it as stored.
    fn create(&self, new: Self::New) -> AppResult<Self::View>;

    /// Applies `changes` to the record with the given id.
    fn update(&self, id: i32, changes: Self::Changes) -> AppResult<Self::View>;

    /// Removes the record with the given id.
    fn delete(&self, id: i32) -> AppResult<()>;
}

/// Filter type for resources without extra listing filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct NoFilter {}

/// Builds an `ILIKE` pattern matching `term` anywhere, with wildcards in the
/// term itself escaped.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Turns a missing row into [`AppError::NotFound`].
pub fn require_found<T>(row: Option<T>, name: &str, id: i32) -> AppResult<T> {
    row.ok_or_else(|| AppError::NotFound(format!("{name} {id}")))
}

/// Fails with [`AppError::NotFound`] when a statement touched no rows.
pub fn require_affected(rows: usize, name: &str, id: i32) -> AppResult<()> {
    if rows == 0 {
        return Err(AppError::NotFound(format!("{name} {id}")));
    }
    Ok(())
}

/// Reads a present field, `null` included, as `Some`.
///
/// Used with `#[serde(default)]` on nullable columns of an update payload:
/// an absent field stays `None` (unchanged), `null` becomes `Some(None)`
/// (cleared).
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Maps errors from `UPDATE ... SET`, reporting an empty changeset as a bad
/// request instead of a database failure.
pub fn changeset_error(err: diesel::result::Error) -> AppError {
    match err {
        diesel::result::Error::QueryBuilderError(_) => {
            AppError::BadRequest("No fields to update".into())
        }
        other => AppError::Database(other),
    }
}
