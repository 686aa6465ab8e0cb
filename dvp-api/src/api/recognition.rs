//! Device recognition API handlers
//!
//! POST /device-recognition/save, GET /device-recognition/history

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::history::{self, HistoryEntry};
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::services::{RecognitionRecorder, RecognitionSubmission};
use crate::AppState;

/// POST /device-recognition/save request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecognitionRequest {
    pub user_id: String,
    pub device_model: String,
    pub manufacturer: String,
    pub year_of_release: Option<i64>,
    pub operating_system: String,
    pub confidence: f64,
    pub analysis_details: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// POST /device-recognition/save response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecognitionResponse {
    pub success: bool,
    pub message: String,
    pub device_passport_id: String,
    pub data: SavedRecognition,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecognition {
    pub id: String,
    pub device_model: String,
    pub manufacturer: String,
}

/// GET /device-recognition/history query parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}

/// One recognition event as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryView {
    pub id: String,
    pub user_id: String,
    pub device_model: String,
    pub manufacturer: String,
    pub year_of_release: Option<i64>,
    pub operating_system: Option<String>,
    pub confidence_score: Option<f64>,
    pub analysis_details: Option<String>,
    pub image_paths: Vec<String>,
    pub recognition_timestamp: String,
    pub device_passport_id: Option<String>,
    pub is_saved: bool,
}

impl From<HistoryEntry> for HistoryEntryView {
    fn from(entry: HistoryEntry) -> Self {
        HistoryEntryView {
            id: entry.guid,
            user_id: entry.user_id,
            device_model: entry.device_model,
            manufacturer: entry.manufacturer,
            year_of_release: entry.year_of_release,
            operating_system: entry.operating_system,
            confidence_score: entry.confidence_score,
            analysis_details: entry.analysis_details,
            image_paths: entry.image_paths,
            recognition_timestamp: entry.recognition_timestamp,
            device_passport_id: entry.passport_uuid,
            is_saved: entry.is_saved,
        }
    }
}

/// GET /device-recognition/history response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub data: Vec<HistoryEntryView>,
}

/// POST /api/v1/device-recognition/save
///
/// Persist one camera recognition as an atomic passport bundle.
/// Confidence is range-checked here; everything else passes through.
pub async fn save_recognition(
    State(state): State<AppState>,
    Json(request): Json<SaveRecognitionRequest>,
) -> ApiResult<(StatusCode, Json<SaveRecognitionResponse>)> {
    if !(0.0..=1.0).contains(&request.confidence) {
        return Err(ApiError::BadRequest(
            "confidence must be between 0 and 1".to_string(),
        ));
    }

    let submission = RecognitionSubmission {
        user_uid: request.user_id,
        device_model: request.device_model,
        manufacturer: request.manufacturer,
        year_of_release: request.year_of_release,
        operating_system: request.operating_system,
        confidence: request.confidence,
        analysis_details: request.analysis_details,
        image_urls: request.image_urls,
    };

    let recorder = RecognitionRecorder::new(state.db.clone());
    let outcome = recorder.ingest(&submission).await?;

    Ok((
        StatusCode::CREATED,
        Json(SaveRecognitionResponse {
            success: true,
            message: "Device saved successfully".to_string(),
            device_passport_id: outcome.passport_uuid.clone(),
            data: SavedRecognition {
                id: outcome.passport_uuid,
                device_model: submission.device_model,
                manufacturer: submission.manufacturer,
            },
        }),
    ))
}

/// GET /api/v1/device-recognition/history?userId=&limit=
///
/// Recognition events for a user, newest first. Limit falls back to the
/// stored default when absent.
pub async fn recognition_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let user_uid = query
        .user_id
        .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))?;

    let user = users::find_by_uid(&state.db, &user_uid)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let entries = history::list_for_user(&state.db, &user.guid, query.limit).await?;

    Ok(Json(HistoryResponse {
        success: true,
        data: entries.into_iter().map(HistoryEntryView::from).collect(),
    }))
}

/// Build device recognition routes
pub fn recognition_routes() -> Router<AppState> {
    Router::new()
        .route("/device-recognition/save", post(save_recognition))
        .route("/device-recognition/history", get(recognition_history))
}
