// src/common/migrations.rs
//! Database schema management

use sqlx::SqlitePool;
use tracing::info;

/// Create the schema if it does not exist yet.
///
/// `subject` is the primary key, which is what keeps concurrent first logins
/// from producing two rows for one person.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            subject TEXT PRIMARY KEY NOT NULL,
            email TEXT,
            display_name TEXT,
            picture_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;

    info!("✅ Database migration completed successfully!");
    Ok(())
}
