//! Recognition ingestion orchestrator
//!
//! Turns one camera-recognition submission into the full persisted bundle:
//! catalog row, diagnosis + value estimation, active passport, device
//! images, and a history entry. All six steps run inside a single
//! transaction; a failure at any step leaves nothing behind.

use chrono::Utc;
use dvp_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::services::catalog_resolver::{self, DeviceDescriptor};
use crate::services::diagnosis_writer::{self, DiagnosisSeed};

/// One recognition submission, as validated by the API boundary
#[derive(Debug, Clone)]
pub struct RecognitionSubmission {
    pub user_uid: String,
    pub device_model: String,
    pub manufacturer: String,
    pub year_of_release: Option<i64>,
    pub operating_system: String,
    pub confidence: f64,
    pub analysis_details: String,
    pub image_urls: Vec<String>,
}

/// What one successful ingestion produced
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub passport_uuid: String,
    pub diagnosis_uuid: String,
    pub device_created: bool,
}

/// Records recognition submissions as atomic passport bundles
pub struct RecognitionRecorder {
    db: SqlitePool,
}

impl RecognitionRecorder {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Persist a submission. Returns the new passport's public uuid.
    ///
    /// Ingestion never creates accounts: an unknown uid is `NotFound`
    /// before anything is written.
    pub async fn ingest(&self, submission: &RecognitionSubmission) -> Result<IngestOutcome> {
        let mut tx = self.db.begin().await?;

        // 1. Resolve the submitting user
        let user_guid: Option<String> = sqlx::query_scalar("SELECT guid FROM users WHERE uid = ?")
            .bind(&submission.user_uid)
            .fetch_optional(&mut *tx)
            .await?;
        let user_guid =
            user_guid.ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        // 2. Find or create the catalog entry
        let descriptor = DeviceDescriptor {
            model: submission.device_model.clone(),
            manufacturer: submission.manufacturer.clone(),
            year_of_release: submission.year_of_release,
            operating_system: Some(submission.operating_system.clone()),
        };
        let (device, device_created) = catalog_resolver::resolve(&mut tx, &descriptor).await?;

        // 3. Diagnosis and value estimation
        let written = diagnosis_writer::write(
            &mut tx,
            &user_guid,
            &device,
            &DiagnosisSeed {
                confidence: submission.confidence,
                analysis: submission.analysis_details.clone(),
            },
        )
        .await?;

        // 4. New active passport pointing at the fresh diagnosis. Every
        // ingestion creates its own passport, even when an active one
        // already exists for the same (user, device) pair.
        let passport_guid = Uuid::new_v4().to_string();
        let passport_uuid = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO device_passports (
                guid, passport_uuid, user_id, device_id,
                last_diagnosis_id, is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&passport_guid)
        .bind(&passport_uuid)
        .bind(&user_guid)
        .bind(&device.guid)
        .bind(&written.diagnosis.guid)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        // 5. Attach submitted images to the device
        for image_url in &submission.image_urls {
            sqlx::query(
                r#"
                INSERT INTO device_images (guid, device_id, image_path, image_type, uploaded_by)
                VALUES (?, ?, ?, 'diagnostic', ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&device.guid)
            .bind(image_url)
            .bind(&user_guid)
            .execute(&mut *tx)
            .await?;
        }

        // 6. History entry: the raw submission, denormalized, plus the
        // passport back-reference
        let image_paths_json = serde_json::to_string(&submission.image_urls)
            .map_err(|e| Error::Internal(format!("serialize image paths: {}", e)))?;
        sqlx::query(
            r#"
            INSERT INTO device_recognition_history (
                guid, user_id, device_model, manufacturer, year_of_release,
                operating_system, confidence_score, analysis_details,
                image_paths, recognition_timestamp, device_passport_id, is_saved
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user_guid)
        .bind(&submission.device_model)
        .bind(&submission.manufacturer)
        .bind(submission.year_of_release)
        .bind(&submission.operating_system)
        .bind(submission.confidence)
        .bind(&submission.analysis_details)
        .bind(&image_paths_json)
        .bind(&now)
        .bind(&passport_guid)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            passport_uuid = %passport_uuid,
            device_model = %submission.device_model,
            user_id = %submission.user_uid,
            device_created,
            "Device recognition saved"
        );

        Ok(IngestOutcome {
            passport_uuid,
            diagnosis_uuid: written.diagnosis.diagnosis_uuid,
            device_created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

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

    fn submission() -> RecognitionSubmission {
        RecognitionSubmission {
            user_uid: "u1".to_string(),
            device_model: "iPhone 14".to_string(),
            manufacturer: "Apple".to_string(),
            year_of_release: None,
            operating_system: "iOS 17".to_string(),
            confidence: 0.85,
            analysis_details: "minor scratches".to_string(),
            image_urls: vec!["img1.jpg".to_string()],
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ingestion_creates_the_full_bundle() {
        let pool = setup_pool().await;
        let recorder = RecognitionRecorder::new(pool.clone());

        let outcome = recorder.ingest(&submission()).await.unwrap();
        assert!(outcome.device_created);
        assert!(outcome.diagnosis_uuid.starts_with("diag_"));

        assert_eq!(count(&pool, "devices").await, 1);
        assert_eq!(count(&pool, "diagnoses").await, 1);
        assert_eq!(count(&pool, "value_estimations").await, 1);
        assert_eq!(count(&pool, "device_passports").await, 1);
        assert_eq!(count(&pool, "device_images").await, 1);
        assert_eq!(count(&pool, "device_recognition_history").await, 1);

        let passport = db::passports::find_by_uuid(&pool, &outcome.passport_uuid)
            .await
            .unwrap()
            .unwrap();
        assert!(passport.is_active);
        let diagnosis = db::diagnoses::get(&pool, passport.last_diagnosis_id.as_deref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(diagnosis.confidence_score, Some(0.85));
        assert_eq!(diagnosis.ai_analysis.as_deref(), Some("minor scratches"));

        let estimation = db::diagnoses::estimation_for(&pool, &diagnosis.guid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(estimation.current_value, Some(35000.0));
        assert_eq!(estimation.post_repair_value, Some(42000.0));
        assert_eq!(estimation.parts_value, Some(14000.0));

        let history = db::history::list_for_user(&pool, "u-guid", None)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_saved);
        assert_eq!(history[0].image_paths, vec!["img1.jpg"]);
        assert_eq!(
            history[0].passport_uuid.as_deref(),
            Some(outcome.passport_uuid.as_str())
        );
    }

    #[tokio::test]
    async fn unknown_user_writes_nothing() {
        let pool = setup_pool().await;
        let recorder = RecognitionRecorder::new(pool.clone());

        let mut bad = submission();
        bad.user_uid = "nobody".to_string();
        let err = recorder.ingest(&bad).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        assert_eq!(count(&pool, "devices").await, 0);
        assert_eq!(count(&pool, "device_passports").await, 0);
        assert_eq!(count(&pool, "device_recognition_history").await, 0);
    }

    #[tokio::test]
    async fn repeat_ingestion_reuses_catalog_row_but_creates_new_passport() {
        let pool = setup_pool().await;
        let recorder = RecognitionRecorder::new(pool.clone());

        let first = recorder.ingest(&submission()).await.unwrap();
        let second = recorder.ingest(&submission()).await.unwrap();

        assert!(first.device_created);
        assert!(!second.device_created);
        assert_ne!(first.passport_uuid, second.passport_uuid);

        // One catalog row, two simultaneously active passports for the
        // same (user, device) pair
        assert_eq!(count(&pool, "devices").await, 1);
        assert_eq!(count(&pool, "device_passports").await, 2);
        let active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM device_passports WHERE is_active = 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(active, 2);
    }

    #[tokio::test]
    async fn failure_at_the_last_step_rolls_back_everything() {
        let pool = setup_pool().await;
        let recorder = RecognitionRecorder::new(pool.clone());

        // Make step 6 fail after steps 1-5 succeeded
        sqlx::query("DROP TABLE device_recognition_history")
            .execute(&pool)
            .await
            .unwrap();

        let result = recorder.ingest(&submission()).await;
        assert!(result.is_err());

        assert_eq!(count(&pool, "devices").await, 0);
        assert_eq!(count(&pool, "diagnoses").await, 0);
        assert_eq!(count(&pool, "value_estimations").await, 0);
        assert_eq!(count(&pool, "device_passports").await, 0);
        assert_eq!(count(&pool, "device_images").await, 0);
    }

    #[tokio::test]
    async fn empty_image_list_is_accepted() {
        let pool = setup_pool().await;
        let recorder = RecognitionRecorder::new(pool.clone());

        let mut no_images = submission();
        no_images.image_urls = Vec::new();
        recorder.ingest(&no_images).await.unwrap();

        assert_eq!(count(&pool, "device_images").await, 0);
        let history = db::history::list_for_user(&pool, "u-guid", None)
            .await
            .unwrap();
        assert!(history[0].image_paths.is_empty());
    }
}
