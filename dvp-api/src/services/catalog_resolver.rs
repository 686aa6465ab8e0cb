//! Device catalog resolution
//!
//! Deduplicates catalog entries by their (device_model, manufacturer)
//! natural key inside the caller's transaction. The devices table carries a
//! UNIQUE constraint on that pair, so a lost insert race degrades to an
//! INSERT OR IGNORE no-op and the re-fetch returns the winner's row; the
//! caller never sees the conflict.

use chrono::{Datelike, Utc};
use dvp_common::{Error, Result};
use sqlx::Sqlite;
use uuid::Uuid;

use crate::db::devices::{map_device, Device};

/// Submitted identity of a device plus the defaults used only when the
/// catalog entry does not exist yet. First write wins: an existing entry is
/// returned unchanged and the defaults are ignored.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub model: String,
    pub manufacturer: String,
    /// Release year for a new entry; current year when absent
    pub year_of_release: Option<i64>,
    pub operating_system: Option<String>,
}

/// Find the catalog entry for the descriptor's (model, manufacturer) pair,
/// creating it when missing.
///
/// Returns the device and whether a new row was inserted.
pub async fn resolve(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    descriptor: &DeviceDescriptor,
) -> Result<(Device, bool)> {
    if let Some(device) = fetch_pair(tx, &descriptor.model, &descriptor.manufacturer).await? {
        tracing::debug!(
            device_id = %device.guid,
            device_model = %device.device_model,
            "Reusing existing catalog entry"
        );
        return Ok((device, false));
    }

    let guid = Uuid::new_v4();
    let year = descriptor
        .year_of_release
        .unwrap_or_else(|| Utc::now().year() as i64);

    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO devices (
            guid, device_model, manufacturer, year_of_release, operating_system,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(guid.to_string())
    .bind(&descriptor.model)
    .bind(&descriptor.manufacturer)
    .bind(year)
    .bind(&descriptor.operating_system)
    .execute(&mut **tx)
    .await?;

    // rows_affected == 0 means a concurrent resolver won the insert; either
    // way the pair now exists and the re-fetch returns the surviving row.
    let created = inserted.rows_affected() > 0;

    let device = fetch_pair(tx, &descriptor.model, &descriptor.manufacturer)
        .await?
        .ok_or_else(|| {
            Error::Internal(format!(
                "Catalog entry missing after insert: {} / {}",
                descriptor.model, descriptor.manufacturer
            ))
        })?;

    if created {
        tracing::debug!(
            device_id = %device.guid,
            device_model = %device.device_model,
            manufacturer = %device.manufacturer,
            "Created new catalog entry"
        );
    }

    Ok((device, created))
}

async fn fetch_pair(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    model: &str,
    manufacturer: &str,
) -> Result<Option<Device>> {
    let row = sqlx::query(
        r#"
        SELECT guid, device_model, manufacturer, year_of_release,
               operating_system, category, base_value
        FROM devices
        WHERE device_model = ? AND manufacturer = ?
        "#,
    )
    .bind(model)
    .bind(manufacturer)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(map_device))
}
