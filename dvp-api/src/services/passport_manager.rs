//! Device passport lifecycle
//!
//! Passports are created active by the ingestion transaction and only ever
//! move active -> inactive here; there is no reactivation path. Reads expand
//! each passport row into the joined client view.

use chrono::Utc;
use dvp_common::{Error, Result};
use sqlx::SqlitePool;

use crate::db::{devices, diagnoses, passports, users};
use crate::db::passports::Passport;
use crate::models::passport_view::PassportView;

/// Lists, fetches and soft-deletes device passports
pub struct PassportManager {
    db: SqlitePool,
}

impl PassportManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// All active passports for a user, newest first, fully expanded.
    /// `NotFound` when the uid resolves to no user.
    pub async fn list(&self, user_uid: &str) -> Result<Vec<PassportView>> {
        let user = users::find_by_uid(&self.db, user_uid)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        let passports = passports::list_active_for_user(&self.db, &user.guid).await?;
        let mut views = Vec::with_capacity(passports.len());
        for passport in &passports {
            views.push(self.expand(passport, &user.uid).await?);
        }

        Ok(views)
    }

    /// One passport by public uuid, active or not.
    pub async fn get(&self, passport_uuid: &str) -> Result<PassportView> {
        let passport = passports::find_by_uuid(&self.db, passport_uuid)
            .await?
            .ok_or_else(|| Error::NotFound("Device passport not found".to_string()))?;

        let owner = users::find_by_guid(&self.db, &passport.user_id)
            .await?
            .ok_or_else(|| Error::Internal("Passport owner row missing".to_string()))?;

        self.expand(&passport, &owner.uid).await
    }

    /// Soft-delete by public uuid. Unknown uuid is `NotFound`; deactivating
    /// an already-inactive passport succeeds again (idempotent).
    pub async fn deactivate(&self, passport_uuid: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let found = passports::deactivate(&self.db, passport_uuid, &now).await?;
        if !found {
            return Err(Error::NotFound("Device passport not found".to_string()));
        }

        tracing::info!(passport_uuid = %passport_uuid, "Device passport deactivated");
        Ok(())
    }

    /// Join the device row, its images, and the last diagnosis with its
    /// estimation into the read model. Missing diagnosis data is fine; the
    /// view substitutes defaults.
    async fn expand(&self, passport: &Passport, user_uid: &str) -> Result<PassportView> {
        let device = devices::get(&self.db, &passport.device_id)
            .await?
            .ok_or_else(|| Error::Internal("Passport device row missing".to_string()))?;
        let images = devices::image_paths(&self.db, &device.guid).await?;

        let diagnosis = match &passport.last_diagnosis_id {
            Some(id) => diagnoses::get(&self.db, id).await?,
            None => None,
        };
        let estimation = match &diagnosis {
            Some(d) => diagnoses::estimation_for(&self.db, &d.guid).await?,
            None => None,
        };

        Ok(PassportView::assemble(
            passport,
            user_uid,
            &device,
            images,
            diagnosis.as_ref(),
            estimation.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        dvp_common::db::create_schema(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO users (guid, uid, email) VALUES ('u-guid', 'user-1', 'u@example.com')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO devices (guid, device_model, manufacturer, year_of_release, operating_system)
             VALUES ('d-guid', 'iPhone 14', 'Apple', 2022, 'iOS 17')",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    async fn seed_passport(pool: &SqlitePool, guid: &str, uuid: &str, active: bool, created_at: &str) {
        sqlx::query(
            "INSERT INTO device_passports
                 (guid, passport_uuid, user_id, device_id, last_diagnosis_id, is_active, created_at, updated_at)
             VALUES (?, ?, 'u-guid', 'd-guid', NULL, ?, ?, ?)",
        )
        .bind(guid)
        .bind(uuid)
        .bind(active)
        .bind(created_at)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn list_returns_active_passports_newest_first() {
        let pool = setup_pool().await;
        seed_passport(&pool, "p1", "uuid-1", true, "2025-01-01T00:00:00+00:00").await;
        seed_passport(&pool, "p2", "uuid-2", true, "2025-02-01T00:00:00+00:00").await;
        seed_passport(&pool, "p3", "uuid-3", false, "2025-03-01T00:00:00+00:00").await;

        let manager = PassportManager::new(pool);
        let views = manager.list("user-1").await.unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, "uuid-2");
        assert_eq!(views[1].id, "uuid-1");
        assert_eq!(views[0].user_id, "user-1");
        assert_eq!(views[0].device_model, "iPhone 14");
    }

    #[tokio::test]
    async fn list_unknown_user_is_not_found() {
        let pool = setup_pool().await;
        let manager = PassportManager::new(pool);

        let err = manager.list("nobody").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn get_returns_inactive_passports_too() {
        let pool = setup_pool().await;
        seed_passport(&pool, "p1", "uuid-1", false, "2025-01-01T00:00:00+00:00").await;

        let manager = PassportManager::new(pool);
        let view = manager.get("uuid-1").await.unwrap();

        assert_eq!(view.id, "uuid-1");
        assert_eq!(view.user_id, "user-1");
    }

    #[tokio::test]
    async fn get_unknown_uuid_is_not_found() {
        let pool = setup_pool().await;
        let manager = PassportManager::new(pool);

        let err = manager.get("no-such-uuid").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn expansion_substitutes_defaults_without_diagnosis() {
        let pool = setup_pool().await;
        seed_passport(&pool, "p1", "uuid-1", true, "2025-01-01T00:00:00+00:00").await;

        let manager = PassportManager::new(pool);
        let view = manager.get("uuid-1").await.unwrap();

        let diag = &view.last_diagnosis;
        assert_eq!(diag.ai_analysis, "No analysis available");
        assert_eq!(diag.confidence_score, 0.8);
        assert_eq!(diag.value_estimation.current_value, 5000.0);
        assert_eq!(diag.device_health.life_cycle_stage, "Active");
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let pool = setup_pool().await;
        seed_passport(&pool, "p1", "uuid-1", true, "2025-01-01T00:00:00+00:00").await;

        let manager = PassportManager::new(pool.clone());
        manager.deactivate("uuid-1").await.unwrap();

        let active: bool =
            sqlx::query_scalar("SELECT is_active FROM device_passports WHERE passport_uuid = 'uuid-1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(!active);

        // Second deactivation of the same passport is still success
        manager.deactivate("uuid-1").await.unwrap();
    }

    #[tokio::test]
    async fn deactivate_unknown_uuid_is_not_found() {
        let pool = setup_pool().await;
        let manager = PassportManager::new(pool);

        let err = manager.deactivate("no-such-uuid").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
