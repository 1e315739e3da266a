//! # Database
//!
//! Connection pooling and embedded migrations.

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{AppError, AppResult};

/// Shared PostgreSQL connection pool.
pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Migrations compiled into the binary from `core/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Opens a pool of at most `max_size` connections to `database_url`.
///
/// Fails when the initial connections cannot be established.
pub fn connect(database_url: &str, max_size: u32) -> AppResult<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .test_on_check_out(true)
        .build(manager)
        .map_err(|e| AppError::General(format!("could not create pool: {e}")))
}

/// Applies every pending migration and returns how many ran.
pub fn run_migrations(pool: &DbPool) -> AppResult<usize> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| AppError::Migration(e.to_string()))?;
    for version in &applied {
        tracing::info!(%version, "applied migration");
    }
    Ok(applied.len())
}

