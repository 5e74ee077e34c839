use anyhow::Result;
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use std::time::Duration;

use crate::models::EthnicityGender;

pub mod contract_store;
pub mod session_store;
pub mod subgrant_store;
pub mod user_store;

pub use contract_store::ContractStore;
pub use session_store::SessionStore;
pub use subgrant_store::SubgrantStore;
pub use user_store::UserStore;

pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool
pub async fn init_db_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<DbPool> {
    // Create the database if it doesn't exist
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await?;

    setup_database(&pool).await?;
    migrate_legacy_categories(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database for tests
#[cfg(test)]
pub async fn init_test_pool() -> DbPool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("memory url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("connect to in-memory sqlite");
    setup_database(&pool).await.expect("create schema");
    pool
}

/// Set up the database schema
pub async fn setup_database(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BLOB PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id BLOB PRIMARY KEY NOT NULL,
            user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            revoked_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Amounts are stored as decimal strings
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contracts (
            id BLOB PRIMARY KEY NOT NULL,
            tad_project_number TEXT NOT NULL,
            contract_number TEXT NOT NULL,
            prime_contractor TEXT NOT NULL,
            original_amount TEXT NOT NULL,
            dbe_percentage TEXT NOT NULL DEFAULT '0',
            final_report INTEGER NOT NULL DEFAULT 0,
            award_date TEXT,
            report_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            created_by BLOB NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subgrants (
            id BLOB PRIMARY KEY NOT NULL,
            contract_id BLOB NOT NULL REFERENCES contracts(id) ON DELETE CASCADE,
            dbe_firm_name TEXT NOT NULL,
            naics_code TEXT NOT NULL CHECK (length(naics_code) = 6 AND naics_code NOT GLOB '*[^0-9]*'),
            amount TEXT NOT NULL,
            contract_type TEXT NOT NULL DEFAULT 'Subcontract',
            certified_dbe INTEGER NOT NULL DEFAULT 0,
            award_date TEXT,
            ethnicity_gender TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            created_by BLOB NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_subgrants_contract_id ON subgrants(contract_id);")
        .execute(pool)
        .await?;

    Ok(())
}

/// Rewrite coded or loosely spelled ethnicity/gender categories into the
/// canonical pair encoding.
///
/// Every rewrite is logged. Values that are neither canonical nor a known
/// legacy code are left as they are and reported, so nothing is merged
/// silently. Returns the number of rows rewritten.
pub async fn migrate_legacy_categories(pool: &DbPool) -> Result<u64> {
    let rows: Vec<(uuid::Uuid, String)> = sqlx::query_as(
        "SELECT id, ethnicity_gender FROM subgrants WHERE ethnicity_gender IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    let mut migrated = 0;
    for (id, category) in rows {
        let canonical = match category.parse::<EthnicityGender>() {
            Ok(parsed) => parsed.to_string(),
            Err(_) => match EthnicityGender::from_legacy_code(&category) {
                Some(converted) => converted.to_string(),
                None => {
                    tracing::warn!(subgrant = %id, %category, "Unrecognised ethnicity/gender category left in place");
                    continue;
                }
            },
        };
        if canonical == category {
            continue;
        }

        sqlx::query("UPDATE subgrants SET ethnicity_gender = ? WHERE id = ?")
            .bind(&canonical)
            .bind(id)
            .execute(pool)
            .await?;
        tracing::info!(subgrant = %id, from = %category, to = %canonical, "Migrated ethnicity/gender category");
        migrated += 1;
    }

    if migrated > 0 {
        tracing::info!("Migrated {} legacy ethnicity/gender categories", migrated);
    }
    Ok(migrated)
}

/// Decode a decimal column stored as text
pub(crate) fn parse_decimal(value: &str, column: &str) -> crate::error::Result<rust_decimal::Decimal> {
    value.parse().map_err(|_| {
        crate::error::AppError::Internal(format!("invalid decimal {value:?} in column {column}"))
    })
}
