//! Database layer with `SeaORM` entities and the booking store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - `DbBookingStore`, the engine's store on Postgres or SQLite
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::DbBookingStore;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use staybook_shared::config::DatabaseConfig;
use tracing::info;

/// Establishes a connection pool to the configured database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!(
        backend = ?db.get_database_backend(),
        max_connections = config.max_connections,
        "Database connected"
    );
    Ok(db)
}
