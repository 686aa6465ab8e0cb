//! Diagnosis and value estimation database operations
//!
//! Both rows are written together by the ingestion transaction; this module
//! only covers the read side.

use dvp_common::Result;
use sqlx::{Row, SqlitePool};

/// Diagnosis record (one assessment event)
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub guid: String,
    pub diagnosis_uuid: String,
    pub user_id: String,
    pub device_id: String,
    pub battery_health: Option<f64>,
    pub screen_condition: Option<String>,
    pub hardware_condition: Option<String>,
    pub identified_issues: Option<String>,
    pub ai_analysis: Option<String>,
    pub confidence_score: Option<f64>,
    pub life_cycle_stage: Option<String>,
    pub remaining_useful_life: Option<String>,
    pub environmental_impact: Option<String>,
}

/// Monetary breakdown attached 1:1 to a diagnosis
#[derive(Debug, Clone)]
pub struct ValueEstimation {
    pub guid: String,
    pub diagnosis_id: String,
    pub current_value: Option<f64>,
    pub post_repair_value: Option<f64>,
    pub parts_value: Option<f64>,
    pub repair_cost: Option<f64>,
    pub recycling_value: Option<f64>,
    pub currency: String,
    pub market_positioning: Option<String>,
    pub depreciation_rate: Option<String>,
}

/// Load diagnosis by guid
pub async fn get(pool: &SqlitePool, guid: &str) -> Result<Option<Diagnosis>> {
    let row = sqlx::query(
        r#"
        SELECT guid, diagnosis_uuid, user_id, device_id, battery_health,
               screen_condition, hardware_condition, identified_issues,
               ai_analysis, confidence_score, life_cycle_stage,
               remaining_useful_life, environmental_impact
        FROM diagnoses
        WHERE guid = ?
        "#,
    )
    .bind(guid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Diagnosis {
        guid: row.get("guid"),
        diagnosis_uuid: row.get("diagnosis_uuid"),
        user_id: row.get("user_id"),
        device_id: row.get("device_id"),
        battery_health: row.get("battery_health"),
        screen_condition: row.get("screen_condition"),
        hardware_condition: row.get("hardware_condition"),
        identified_issues: row.get("identified_issues"),
        ai_analysis: row.get("ai_analysis"),
        confidence_score: row.get("confidence_score"),
        life_cycle_stage: row.get("life_cycle_stage"),
        remaining_useful_life: row.get("remaining_useful_life"),
        environmental_impact: row.get("environmental_impact"),
    }))
}

/// Load the estimation paired with a diagnosis
pub async fn estimation_for(pool: &SqlitePool, diagnosis_guid: &str) -> Result<Option<ValueEstimation>> {
    let row = sqlx::query(
        r#"
        SELECT guid, diagnosis_id, current_value, post_repair_value,
               parts_value, repair_cost, recycling_value, currency,
               market_positioning, depreciation_rate
        FROM value_estimations
        WHERE diagnosis_id = ?
        "#,
    )
    .bind(diagnosis_guid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ValueEstimation {
        guid: row.get("guid"),
        diagnosis_id: row.get("diagnosis_id"),
        current_value: row.get("current_value"),
        post_repair_value: row.get("post_repair_value"),
        parts_value: row.get("parts_value"),
        repair_cost: row.get("repair_cost"),
        recycling_value: row.get("recycling_value"),
        currency: row.get("currency"),
        market_positioning: row.get("market_positioning"),
        depreciation_rate: row.get("depreciation_rate"),
    }))
}
