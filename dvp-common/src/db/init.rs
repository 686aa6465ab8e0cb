//! Database initialization
//!
//! Creates the database file on first run, applies the schema idempotently
//! with CREATE TABLE IF NOT EXISTS, and seeds default settings.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Set busy timeout
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent - safe to call multiple times)
///
/// Exposed separately from [`init_database`] so tests can apply the schema
/// to an in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_devices_table(pool).await?;
    create_diagnoses_table(pool).await?;
    create_value_estimations_table(pool).await?;
    create_device_images_table(pool).await?;
    create_device_passports_table(pool).await?;
    create_recognition_history_table(pool).await?;
    create_settings_table(pool).await?;

    Ok(())
}

/// Create the users table
///
/// One row per account. `uid` is the externally visible identifier
/// (`local_...` for password accounts, the provider subject for OAuth).
/// Exactly one account per email; OAuth linking rewrites the provider
/// columns of an existing row rather than inserting a second one.
async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            uid TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT,
            photo_url TEXT,
            auth_provider TEXT NOT NULL DEFAULT 'local',
            provider_id TEXT,
            password_hash TEXT,
            password_salt TEXT,
            email_verified INTEGER NOT NULL DEFAULT 0,
            last_login_at TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            preferences TEXT NOT NULL DEFAULT '{}',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_uid ON users(uid)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_provider ON users(auth_provider)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the devices table (the catalog)
///
/// The (device_model, manufacturer) pair is the natural key. The UNIQUE
/// constraint lets find-or-create use INSERT OR IGNORE plus re-fetch, so
/// concurrent resolution of the same pair never yields duplicate rows.
async fn create_devices_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            guid TEXT PRIMARY KEY,
            device_model TEXT NOT NULL,
            manufacturer TEXT NOT NULL,
            year_of_release INTEGER,
            operating_system TEXT,
            category TEXT,
            base_value REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (device_model, manufacturer)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_devices_model ON devices(device_model)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_devices_manufacturer ON devices(manufacturer)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the diagnoses table
///
/// One assessment event per row, written once by ingestion and never
/// updated afterward. `diagnosis_uuid` is the public identifier.
async fn create_diagnoses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS diagnoses (
            guid TEXT PRIMARY KEY,
            diagnosis_uuid TEXT NOT NULL UNIQUE,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            device_id TEXT NOT NULL REFERENCES devices(guid) ON DELETE CASCADE,
            battery_health REAL,
            screen_condition TEXT,
            hardware_condition TEXT,
            identified_issues TEXT,
            ai_analysis TEXT,
            confidence_score REAL,
            life_cycle_stage TEXT,
            remaining_useful_life TEXT,
            environmental_impact TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (confidence_score IS NULL OR (confidence_score >= 0.0 AND confidence_score <= 1.0))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_diagnoses_user ON diagnoses(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_diagnoses_device ON diagnoses(device_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_diagnoses_created ON diagnoses(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the value_estimations table
///
/// Exactly one estimation per diagnosis (UNIQUE on diagnosis_id); ingestion
/// writes both rows in the same transaction.
async fn create_value_estimations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS value_estimations (
            guid TEXT PRIMARY KEY,
            diagnosis_id TEXT NOT NULL UNIQUE REFERENCES diagnoses(guid) ON DELETE CASCADE,
            current_value REAL,
            post_repair_value REAL,
            parts_value REAL,
            repair_cost REAL,
            recycling_value REAL,
            currency TEXT NOT NULL DEFAULT 'PHP',
            market_positioning TEXT,
            depreciation_rate TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the device_images table
async fn create_device_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_images (
            guid TEXT PRIMARY KEY,
            device_id TEXT NOT NULL REFERENCES devices(guid) ON DELETE CASCADE,
            image_path TEXT NOT NULL,
            image_type TEXT NOT NULL DEFAULT 'diagnostic',
            uploaded_by TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            uploaded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_device_images_device ON device_images(device_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the device_passports table
///
/// `created_at` is bound explicitly as an RFC3339 string by the writer so
/// newest-first ordering is stable at sub-second resolution. No uniqueness
/// on (user_id, device_id): repeated scans intentionally create a new
/// passport each time.
async fn create_device_passports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_passports (
            guid TEXT PRIMARY KEY,
            passport_uuid TEXT NOT NULL UNIQUE,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            device_id TEXT NOT NULL REFERENCES devices(guid) ON DELETE CASCADE,
            last_diagnosis_id TEXT REFERENCES diagnoses(guid) ON DELETE SET NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_passports_uuid ON device_passports(passport_uuid)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_passports_user_active ON device_passports(user_id, is_active)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the device_recognition_history table
///
/// Append-only log of recognition submissions. `image_paths` holds a JSON
/// array; `device_passport_id` is cleared (not cascaded) if the passport
/// row is ever deleted.
async fn create_recognition_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_recognition_history (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            device_model TEXT NOT NULL,
            manufacturer TEXT NOT NULL,
            year_of_release INTEGER,
            operating_system TEXT,
            confidence_score REAL,
            analysis_details TEXT,
            image_paths TEXT NOT NULL DEFAULT '[]',
            recognition_timestamp TEXT NOT NULL,
            device_passport_id TEXT REFERENCES device_passports(guid) ON DELETE SET NULL,
            is_saved INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_history_user_time ON device_recognition_history(user_id, recognition_timestamp)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_history_manufacturer ON device_recognition_history(manufacturer)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values, and resets
/// NULL values back to their defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "history_default_limit", "10").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
