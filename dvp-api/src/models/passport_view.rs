//! Expanded passport read-model
//!
//! A passport row alone is just foreign keys. The view joins the device,
//! its images, and the last diagnosis with its value estimation into the
//! shape clients render. Display fields are never null: anything missing
//! is substituted with a stable default here rather than in the client.

use serde::Serialize;

use crate::db::devices::Device;
use crate::db::diagnoses::{Diagnosis, ValueEstimation};
use crate::db::passports::Passport;

/// Fully expanded device passport
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportView {
    /// Public passport identifier (uuid v4)
    pub id: String,
    pub user_id: String,
    pub device_model: String,
    pub manufacturer: String,
    pub year_of_release: Option<i64>,
    pub operating_system: Option<String>,
    pub image_urls: Vec<String>,
    pub last_diagnosis: DiagnosisView,
}

/// Last diagnosis, defaults applied
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisView {
    pub device_model: String,
    pub image_urls: Vec<String>,
    pub ai_analysis: String,
    pub confidence_score: f64,
    pub device_health: DeviceHealthView,
    pub value_estimation: EstimationView,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHealthView {
    pub screen_condition: String,
    pub hardware_condition: String,
    pub identified_issues: Vec<String>,
    pub life_cycle_stage: String,
    pub remaining_useful_life: String,
    pub environmental_impact: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationView {
    pub current_value: f64,
    pub post_repair_value: f64,
    pub parts_value: f64,
    pub repair_cost: f64,
    pub recycling_value: f64,
    pub currency: String,
    pub market_positioning: String,
    pub depreciation_rate: String,
}

impl PassportView {
    /// Join passport, device, images and optional diagnosis data into the
    /// client shape. `user_uid` is the owner's external id; the passport
    /// row itself only carries the internal guid.
    pub fn assemble(
        passport: &Passport,
        user_uid: &str,
        device: &Device,
        image_urls: Vec<String>,
        diagnosis: Option<&Diagnosis>,
        estimation: Option<&ValueEstimation>,
    ) -> Self {
        PassportView {
            id: passport.passport_uuid.clone(),
            user_id: user_uid.to_string(),
            device_model: device.device_model.clone(),
            manufacturer: device.manufacturer.clone(),
            year_of_release: device.year_of_release,
            operating_system: device.operating_system.clone(),
            image_urls: image_urls.clone(),
            last_diagnosis: DiagnosisView::assemble(
                &device.device_model,
                image_urls,
                diagnosis,
                estimation,
            ),
        }
    }
}

impl DiagnosisView {
    fn assemble(
        device_model: &str,
        image_urls: Vec<String>,
        diagnosis: Option<&Diagnosis>,
        estimation: Option<&ValueEstimation>,
    ) -> Self {
        DiagnosisView {
            device_model: device_model.to_string(),
            image_urls,
            ai_analysis: diagnosis
                .and_then(|d| d.ai_analysis.clone())
                .unwrap_or_else(|| "No analysis available".to_string()),
            confidence_score: diagnosis.and_then(|d| d.confidence_score).unwrap_or(0.8),
            device_health: DeviceHealthView::assemble(diagnosis),
            value_estimation: EstimationView::assemble(estimation),
            recommendations: Vec::new(),
        }
    }
}

impl DeviceHealthView {
    fn assemble(diagnosis: Option<&Diagnosis>) -> Self {
        DeviceHealthView {
            screen_condition: diagnosis
                .and_then(|d| d.screen_condition.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            hardware_condition: diagnosis
                .and_then(|d| d.hardware_condition.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            identified_issues: diagnosis
                .and_then(|d| d.identified_issues.as_deref())
                .map(split_issues)
                .unwrap_or_default(),
            life_cycle_stage: diagnosis
                .and_then(|d| d.life_cycle_stage.clone())
                .unwrap_or_else(|| "Active".to_string()),
            remaining_useful_life: diagnosis
                .and_then(|d| d.remaining_useful_life.clone())
                .unwrap_or_else(|| "2-3 years".to_string()),
            environmental_impact: diagnosis
                .and_then(|d| d.environmental_impact.clone())
                .unwrap_or_else(|| "Low carbon footprint".to_string()),
        }
    }
}

impl EstimationView {
    fn assemble(estimation: Option<&ValueEstimation>) -> Self {
        EstimationView {
            current_value: estimation.and_then(|e| e.current_value).unwrap_or(5000.0),
            post_repair_value: estimation
                .and_then(|e| e.post_repair_value)
                .unwrap_or(6000.0),
            parts_value: estimation.and_then(|e| e.parts_value).unwrap_or(2000.0),
            repair_cost: estimation.and_then(|e| e.repair_cost).unwrap_or(1000.0),
            recycling_value: estimation.and_then(|e| e.recycling_value).unwrap_or(500.0),
            currency: estimation
                .map(|e| e.currency.clone())
                .unwrap_or_else(|| "PHP".to_string()),
            market_positioning: estimation
                .and_then(|e| e.market_positioning.clone())
                .unwrap_or_else(|| "Mid-range".to_string()),
            depreciation_rate: estimation
                .and_then(|e| e.depreciation_rate.clone())
                .unwrap_or_else(|| "15% per year".to_string()),
        }
    }
}

/// Stored issues are a comma-joined string; empty means none.
fn split_issues(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_passport() -> Passport {
        Passport {
            guid: "p-guid".to_string(),
            passport_uuid: "11111111-2222-3333-4444-555555555555".to_string(),
            user_id: "u-guid".to_string(),
            device_id: "d-guid".to_string(),
            last_diagnosis_id: None,
            is_active: true,
            created_at: "2025-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn sample_device() -> Device {
        Device {
            guid: "d-guid".to_string(),
            device_model: "iPhone 14".to_string(),
            manufacturer: "Apple".to_string(),
            year_of_release: Some(2022),
            operating_system: Some("iOS".to_string()),
            category: Some("smartphone".to_string()),
            base_value: Some(35000.0),
        }
    }

    fn sample_diagnosis() -> Diagnosis {
        Diagnosis {
            guid: "diag-guid".to_string(),
            diagnosis_uuid: "diag_1700000000_abcd1234".to_string(),
            user_id: "u-guid".to_string(),
            device_id: "d-guid".to_string(),
            battery_health: Some(0.92),
            screen_condition: Some("good".to_string()),
            hardware_condition: Some("fair".to_string()),
            identified_issues: Some("scratched back,weak battery".to_string()),
            ai_analysis: Some("Minor wear".to_string()),
            confidence_score: Some(0.85),
            life_cycle_stage: Some("assessment_needed".to_string()),
            remaining_useful_life: Some("unknown".to_string()),
            environmental_impact: Some("unknown".to_string()),
        }
    }

    fn sample_estimation() -> ValueEstimation {
        ValueEstimation {
            guid: "est-guid".to_string(),
            diagnosis_id: "diag-guid".to_string(),
            current_value: Some(35000.0),
            post_repair_value: Some(42000.0),
            parts_value: Some(14000.0),
            repair_cost: Some(2000.0),
            recycling_value: Some(500.0),
            currency: "PHP".to_string(),
            market_positioning: Some("needs_assessment".to_string()),
            depreciation_rate: Some("standard".to_string()),
        }
    }

    #[test]
    fn assemble_uses_stored_values_when_present() {
        let view = PassportView::assemble(
            &sample_passport(),
            "user-uid-1",
            &sample_device(),
            vec!["img/a.jpg".to_string()],
            Some(&sample_diagnosis()),
            Some(&sample_estimation()),
        );

        assert_eq!(view.id, "11111111-2222-3333-4444-555555555555");
        assert_eq!(view.user_id, "user-uid-1");
        assert_eq!(view.device_model, "iPhone 14");
        assert_eq!(view.last_diagnosis.ai_analysis, "Minor wear");
        assert_eq!(view.last_diagnosis.confidence_score, 0.85);
        assert_eq!(
            view.last_diagnosis.device_health.identified_issues,
            vec!["scratched back", "weak battery"]
        );
        assert_eq!(view.last_diagnosis.value_estimation.current_value, 35000.0);
        assert_eq!(
            view.last_diagnosis.value_estimation.post_repair_value,
            42000.0
        );
        assert!(view.last_diagnosis.recommendations.is_empty());
    }

    #[test]
    fn assemble_falls_back_without_diagnosis() {
        let view = PassportView::assemble(
            &sample_passport(),
            "user-uid-1",
            &sample_device(),
            Vec::new(),
            None,
            None,
        );

        let diag = &view.last_diagnosis;
        assert_eq!(diag.ai_analysis, "No analysis available");
        assert_eq!(diag.confidence_score, 0.8);
        assert_eq!(diag.device_health.screen_condition, "unknown");
        assert_eq!(diag.device_health.hardware_condition, "unknown");
        assert!(diag.device_health.identified_issues.is_empty());
        assert_eq!(diag.device_health.life_cycle_stage, "Active");
        assert_eq!(diag.device_health.remaining_useful_life, "2-3 years");
        assert_eq!(diag.device_health.environmental_impact, "Low carbon footprint");
        assert_eq!(diag.value_estimation.current_value, 5000.0);
        assert_eq!(diag.value_estimation.post_repair_value, 6000.0);
        assert_eq!(diag.value_estimation.parts_value, 2000.0);
        assert_eq!(diag.value_estimation.repair_cost, 1000.0);
        assert_eq!(diag.value_estimation.recycling_value, 500.0);
        assert_eq!(diag.value_estimation.currency, "PHP");
        assert_eq!(diag.value_estimation.market_positioning, "Mid-range");
        assert_eq!(diag.value_estimation.depreciation_rate, "15% per year");
    }

    #[test]
    fn empty_issue_string_yields_no_issues() {
        let mut diagnosis = sample_diagnosis();
        diagnosis.identified_issues = Some(String::new());

        let view = PassportView::assemble(
            &sample_passport(),
            "user-uid-1",
            &sample_device(),
            Vec::new(),
            Some(&diagnosis),
            None,
        );

        assert!(view
            .last_diagnosis
            .device_health
            .identified_issues
            .is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let view = PassportView::assemble(
            &sample_passport(),
            "user-uid-1",
            &sample_device(),
            Vec::new(),
            None,
            None,
        );

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("yearOfRelease").is_some());
        assert!(json["lastDiagnosis"].get("aiAnalysis").is_some());
        assert!(json["lastDiagnosis"]["deviceHealth"]
            .get("identifiedIssues")
            .is_some());
        assert!(json["lastDiagnosis"]["valueEstimation"]
            .get("postRepairValue")
            .is_some());
    }
}
