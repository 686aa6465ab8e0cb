//! Device passport database operations
//!
//! Passports are created by the ingestion transaction; list / lookup /
//! deactivate run against the pool.

use dvp_common::Result;
use sqlx::{Row, SqlitePool};

/// Device passport record
#[derive(Debug, Clone)]
pub struct Passport {
    pub guid: String,
    pub passport_uuid: String,
    pub user_id: String,
    pub device_id: String,
    pub last_diagnosis_id: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

fn map_passport(row: sqlx::sqlite::SqliteRow) -> Passport {
    Passport {
        guid: row.get("guid"),
        passport_uuid: row.get("passport_uuid"),
        user_id: row.get("user_id"),
        device_id: row.get("device_id"),
        last_diagnosis_id: row.get("last_diagnosis_id"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

/// Active passports for a user, newest first
pub async fn list_active_for_user(pool: &SqlitePool, user_guid: &str) -> Result<Vec<Passport>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, passport_uuid, user_id, device_id, last_diagnosis_id,
               is_active, created_at
        FROM device_passports
        WHERE user_id = ? AND is_active = 1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_guid)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(map_passport).collect())
}

/// Lookup by public passport identifier, active or not
pub async fn find_by_uuid(pool: &SqlitePool, passport_uuid: &str) -> Result<Option<Passport>> {
    let row = sqlx::query(
        r#"
        SELECT guid, passport_uuid, user_id, device_id, last_diagnosis_id,
               is_active, created_at
        FROM device_passports
        WHERE passport_uuid = ?
        "#,
    )
    .bind(passport_uuid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_passport))
}

/// Soft-delete a passport. Returns false when no such passport exists.
///
/// Deactivating an already-inactive passport matches the row and counts as
/// success, which keeps the operation idempotent.
pub async fn deactivate(pool: &SqlitePool, passport_uuid: &str, at: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE device_passports
        SET is_active = 0, updated_at = ?
        WHERE passport_uuid = ?
        "#,
    )
    .bind(at)
    .bind(passport_uuid)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
