//! Device catalog database operations

use dvp_common::Result;
use sqlx::{Row, SqlitePool};

/// Device catalog record, keyed by the (device_model, manufacturer) pair
#[derive(Debug, Clone)]
pub struct Device {
    pub guid: String,
    pub device_model: String,
    pub manufacturer: String,
    pub year_of_release: Option<i64>,
    pub operating_system: Option<String>,
    pub category: Option<String>,
    pub base_value: Option<f64>,
}

/// Load device by guid
pub async fn get(pool: &SqlitePool, guid: &str) -> Result<Option<Device>> {
    let row = sqlx::query(
        r#"
        SELECT guid, device_model, manufacturer, year_of_release,
               operating_system, category, base_value
        FROM devices
        WHERE guid = ?
        "#,
    )
    .bind(guid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_device))
}

/// All image paths attached to a device, oldest first
pub async fn image_paths(pool: &SqlitePool, device_guid: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT image_path FROM device_images WHERE device_id = ? ORDER BY uploaded_at, guid",
    )
    .bind(device_guid)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("image_path")).collect())
}

pub(crate) fn map_device(row: sqlx::sqlite::SqliteRow) -> Device {
    Device {
        guid: row.get("guid"),
        device_model: row.get("device_model"),
        manufacturer: row.get("manufacturer"),
        year_of_release: row.get("year_of_release"),
        operating_system: row.get("operating_system"),
        category: row.get("category"),
        base_value: row.get("base_value"),
    }
}
