//! Device passport API handlers
//!
//! GET /device-passports, GET + DELETE /device-passports/:passport_uuid

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::PassportView;
use crate::services::PassportManager;
use crate::AppState;

/// GET /device-passports query parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPassportsQuery {
    pub user_id: Option<String>,
}

/// GET /device-passports response
#[derive(Debug, Serialize)]
pub struct PassportListResponse {
    pub success: bool,
    pub data: Vec<PassportView>,
}

/// GET /device-passports/:passport_uuid response
#[derive(Debug, Serialize)]
pub struct PassportResponse {
    pub success: bool,
    pub data: PassportView,
}

/// DELETE /device-passports/:passport_uuid response
#[derive(Debug, Serialize)]
pub struct DeletePassportResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/v1/device-passports?userId=
///
/// Every active passport of the user, newest first, fully expanded.
pub async fn list_passports(
    State(state): State<AppState>,
    Query(query): Query<ListPassportsQuery>,
) -> ApiResult<Json<PassportListResponse>> {
    let user_uid = query
        .user_id
        .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))?;

    let manager = PassportManager::new(state.db.clone());
    let views = manager.list(&user_uid).await?;

    Ok(Json(PassportListResponse {
        success: true,
        data: views,
    }))
}

/// GET /api/v1/device-passports/:passport_uuid
///
/// One passport by public uuid, active or not.
pub async fn get_passport(
    State(state): State<AppState>,
    Path(passport_uuid): Path<String>,
) -> ApiResult<Json<PassportResponse>> {
    let manager = PassportManager::new(state.db.clone());
    let view = manager.get(&passport_uuid).await?;

    Ok(Json(PassportResponse {
        success: true,
        data: view,
    }))
}

/// DELETE /api/v1/device-passports/:passport_uuid
///
/// Soft-delete. Repeating the call succeeds again.
pub async fn delete_passport(
    State(state): State<AppState>,
    Path(passport_uuid): Path<String>,
) -> ApiResult<Json<DeletePassportResponse>> {
    let manager = PassportManager::new(state.db.clone());
    manager.deactivate(&passport_uuid).await?;

    Ok(Json(DeletePassportResponse {
        success: true,
        message: "Device passport removed successfully".to_string(),
    }))
}

/// Build device passport routes
pub fn passport_routes() -> Router<AppState> {
    Router::new()
        .route("/device-passports", get(list_passports))
        .route(
            "/device-passports/:passport_uuid",
            get(get_passport).delete(delete_passport),
        )
}
