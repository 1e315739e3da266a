#![deny(missing_docs)]

//! # Dialysis Core
//!
//! Storage layer for the dialysis scheduling API: models, PostgreSQL
//! gateways and the on-disk patient history store.

/// Shared error types.
pub mod error;

/// Diesel table definitions.
pub mod schema;

/// Connection pool and migrations.
pub mod db;

/// Paging and search parameters.
pub mod pagination;

/// The storage trait implemented per resource.
pub mod gateway;

/// Per-resource models and gateways.
pub mod resources;

/// Patient history folders on disk.
pub mod history;

pub use db::DbPool;
pub use error::{AppError, AppResult};
pub use gateway::{Gateway, NoFilter};
pub use history::HistoryStore;
pub use pagination::{ListQuery, Page, PageRequest};
pub use resources::HistoryLedger;
