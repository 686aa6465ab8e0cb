//! Diagnosis and value estimation writer
//!
//! Creates one assessment record and its monetary breakdown in the caller's
//! transaction. Camera recognition cannot judge physical condition, so the
//! condition fields start at the "unknown" sentinel and the life-cycle stage
//! at "assessment_needed"; a later diagnostic flow owns updating them.
//! Both inserts ride the same transaction: a diagnosis is never durable
//! without its estimation.

use chrono::Utc;
use dvp_common::Result;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::Sqlite;
use uuid::Uuid;

use crate::db::devices::Device;
use crate::db::diagnoses::{Diagnosis, ValueEstimation};
use crate::services::value_estimator;

/// Assessment inputs taken from the recognition submission.
/// Confidence is validated at the API boundary and trusted here.
#[derive(Debug, Clone)]
pub struct DiagnosisSeed {
    pub confidence: f64,
    pub analysis: String,
}

/// The diagnosis/estimation pair produced by one ingestion
#[derive(Debug, Clone)]
pub struct WrittenDiagnosis {
    pub diagnosis: Diagnosis,
    pub estimation: ValueEstimation,
}

/// Insert a diagnosis and its paired value estimation for (user, device).
pub async fn write(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    user_guid: &str,
    device: &Device,
    seed: &DiagnosisSeed,
) -> Result<WrittenDiagnosis> {
    let diagnosis = Diagnosis {
        guid: Uuid::new_v4().to_string(),
        diagnosis_uuid: new_diagnosis_uuid(),
        user_id: user_guid.to_string(),
        device_id: device.guid.clone(),
        battery_health: None,
        screen_condition: Some("unknown".to_string()),
        hardware_condition: Some("unknown".to_string()),
        identified_issues: Some(String::new()),
        ai_analysis: Some(seed.analysis.clone()),
        confidence_score: Some(seed.confidence),
        life_cycle_stage: Some("assessment_needed".to_string()),
        remaining_useful_life: Some("unknown".to_string()),
        environmental_impact: Some("unknown".to_string()),
    };

    sqlx::query(
        r#"
        INSERT INTO diagnoses (
            guid, diagnosis_uuid, user_id, device_id, battery_health,
            screen_condition, hardware_condition, identified_issues,
            ai_analysis, confidence_score, life_cycle_stage,
            remaining_useful_life, environmental_impact,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&diagnosis.guid)
    .bind(&diagnosis.diagnosis_uuid)
    .bind(&diagnosis.user_id)
    .bind(&diagnosis.device_id)
    .bind(diagnosis.battery_health)
    .bind(&diagnosis.screen_condition)
    .bind(&diagnosis.hardware_condition)
    .bind(&diagnosis.identified_issues)
    .bind(&diagnosis.ai_analysis)
    .bind(diagnosis.confidence_score)
    .bind(&diagnosis.life_cycle_stage)
    .bind(&diagnosis.remaining_useful_life)
    .bind(&diagnosis.environmental_impact)
    .execute(&mut **tx)
    .await?;

    let breakdown = value_estimator::estimate(&device.manufacturer, &device.device_model);
    let estimation = ValueEstimation {
        guid: Uuid::new_v4().to_string(),
        diagnosis_id: diagnosis.guid.clone(),
        current_value: Some(breakdown.current_value),
        post_repair_value: Some(breakdown.post_repair_value),
        parts_value: Some(breakdown.parts_value),
        repair_cost: Some(breakdown.repair_cost),
        recycling_value: Some(breakdown.recycling_value),
        currency: breakdown.currency.to_string(),
        market_positioning: Some(breakdown.market_positioning.to_string()),
        depreciation_rate: Some(breakdown.depreciation_rate.to_string()),
    };

    sqlx::query(
        r#"
        INSERT INTO value_estimations (
            guid, diagnosis_id, current_value, post_repair_value, parts_value,
            repair_cost, recycling_value, currency, market_positioning,
            depreciation_rate, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&estimation.guid)
    .bind(&estimation.diagnosis_id)
    .bind(estimation.current_value)
    .bind(estimation.post_repair_value)
    .bind(estimation.parts_value)
    .bind(estimation.repair_cost)
    .bind(estimation.recycling_value)
    .bind(&estimation.currency)
    .bind(&estimation.market_positioning)
    .bind(&estimation.depreciation_rate)
    .execute(&mut **tx)
    .await?;

    tracing::debug!(
        diagnosis_uuid = %diagnosis.diagnosis_uuid,
        device_id = %device.guid,
        confidence = seed.confidence,
        current_value = breakdown.current_value,
        "Wrote diagnosis and value estimation"
    );

    Ok(WrittenDiagnosis {
        diagnosis,
        estimation,
    })
}

/// Public diagnosis identifier: unix-seconds prefix plus a random
/// 8-character alphanumeric suffix. Only uniqueness matters.
fn new_diagnosis_uuid() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("diag_{}_{}", Utc::now().timestamp(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog_resolver::{self, DeviceDescriptor};
    use sqlx::SqlitePool;

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        dvp_common::db::create_schema(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO users (guid, uid, email) VALUES ('u-guid', 'u1', 'u1@example.com')",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    async fn resolve_device(pool: &SqlitePool, model: &str, manufacturer: &str) -> Device {
        let mut tx = pool.begin().await.unwrap();
        let (device, _) = catalog_resolver::resolve(
            &mut tx,
            &DeviceDescriptor {
                model: model.to_string(),
                manufacturer: manufacturer.to_string(),
                year_of_release: Some(2022),
                operating_system: Some("iOS 17".to_string()),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        device
    }

    #[tokio::test]
    async fn writes_paired_rows() {
        let pool = setup_pool().await;
        let device = resolve_device(&pool, "iPhone 14", "Apple").await;

        let mut tx = pool.begin().await.unwrap();
        let written = write(
            &mut tx,
            "u-guid",
            &device,
            &DiagnosisSeed {
                confidence: 0.85,
                analysis: "minor scratches".to_string(),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let diag_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM diagnoses")
            .fetch_one(&pool)
            .await
            .unwrap();
        let est_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM value_estimations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(diag_count, 1);
        assert_eq!(est_count, 1);

        assert_eq!(written.estimation.diagnosis_id, written.diagnosis.guid);
        assert_eq!(written.diagnosis.confidence_score, Some(0.85));
        assert_eq!(
            written.diagnosis.ai_analysis.as_deref(),
            Some("minor scratches")
        );
        assert_eq!(written.diagnosis.screen_condition.as_deref(), Some("unknown"));
        assert_eq!(
            written.diagnosis.life_cycle_stage.as_deref(),
            Some("assessment_needed")
        );

        // iPhone 14 base value and its derived figures
        assert_eq!(written.estimation.current_value, Some(35000.0));
        assert_eq!(written.estimation.post_repair_value, Some(42000.0));
        assert_eq!(written.estimation.parts_value, Some(14000.0));
        assert_eq!(written.estimation.repair_cost, Some(2000.0));
        assert_eq!(written.estimation.recycling_value, Some(500.0));
        assert_eq!(written.estimation.currency, "PHP");
    }

    #[tokio::test]
    async fn rolled_back_transaction_leaves_no_rows() {
        let pool = setup_pool().await;
        let device = resolve_device(&pool, "iPhone 14", "Apple").await;

        let mut tx = pool.begin().await.unwrap();
        write(
            &mut tx,
            "u-guid",
            &device,
            &DiagnosisSeed {
                confidence: 0.5,
                analysis: "aborted".to_string(),
            },
        )
        .await
        .unwrap();
        tx.rollback().await.unwrap();

        let diag_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM diagnoses")
            .fetch_one(&pool)
            .await
            .unwrap();
        let est_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM value_estimations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(diag_count, 0);
        assert_eq!(est_count, 0);
    }

    #[tokio::test]
    async fn diagnosis_identifiers_are_unique() {
        let a = new_diagnosis_uuid();
        let b = new_diagnosis_uuid();

        assert!(a.starts_with("diag_"));
        assert_eq!(a.rsplit('_').next().unwrap().len(), 8);
        assert_ne!(a, b);
    }
}
