//! API-facing view models

pub mod passport_view;

pub use passport_view::{DeviceHealthView, DiagnosisView, EstimationView, PassportView};
