//! Recognition history database operations

use dvp_common::{Error, Result};
use sqlx::{Row, SqlitePool};

/// One recognition event, saved or not. `passport_uuid` is the public id
/// of the passport the event produced, while that passport still exists
/// (the back-reference is cleared, not cascaded, on passport deletion).
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub guid: String,
    pub user_id: String,
    pub device_model: String,
    pub manufacturer: String,
    pub year_of_release: Option<i64>,
    pub operating_system: Option<String>,
    pub confidence_score: Option<f64>,
    pub analysis_details: Option<String>,
    pub image_paths: Vec<String>,
    pub recognition_timestamp: String,
    pub passport_uuid: Option<String>,
    pub is_saved: bool,
}

/// Recognition events for a user, newest first.
///
/// When the caller passes no limit the `history_default_limit` setting
/// applies (seeded at init, falls back to 10 when unparseable). Negative
/// limits clamp to zero; SQLite would otherwise treat them as unlimited.
pub async fn list_for_user(
    pool: &SqlitePool,
    user_guid: &str,
    limit: Option<i64>,
) -> Result<Vec<HistoryEntry>> {
    let limit = match limit {
        Some(n) => n.max(0),
        None => default_limit(pool).await?,
    };

    let rows = sqlx::query(
        r#"
        SELECT h.guid, h.user_id, h.device_model, h.manufacturer,
               h.year_of_release, h.operating_system, h.confidence_score,
               h.analysis_details, h.image_paths, h.recognition_timestamp,
               p.passport_uuid, h.is_saved
        FROM device_recognition_history h
        LEFT JOIN device_passports p ON p.guid = h.device_passport_id
        WHERE h.user_id = ?
        ORDER BY h.recognition_timestamp DESC
        LIMIT ?
        "#,
    )
    .bind(user_guid)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let image_paths_json: String = row.get("image_paths");
            let image_paths: Vec<String> = serde_json::from_str(&image_paths_json)
                .map_err(|e| Error::Internal(format!("corrupt image_paths JSON: {}", e)))?;
            Ok(HistoryEntry {
                guid: row.get("guid"),
                user_id: row.get("user_id"),
                device_model: row.get("device_model"),
                manufacturer: row.get("manufacturer"),
                year_of_release: row.get("year_of_release"),
                operating_system: row.get("operating_system"),
                confidence_score: row.get("confidence_score"),
                analysis_details: row.get("analysis_details"),
                image_paths,
                recognition_timestamp: row.get("recognition_timestamp"),
                passport_uuid: row.get("passport_uuid"),
                is_saved: row.get("is_saved"),
            })
        })
        .collect()
}

async fn default_limit(pool: &SqlitePool) -> Result<i64> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'history_default_limit'")
            .fetch_optional(pool)
            .await?;

    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(10))
}
