//! Service modules for the diagnostics backend
//!
//! Core logic lives here; HTTP handlers stay thin and call into these.

pub mod catalog_resolver;
pub mod diagnosis_writer;
pub mod identity_resolver;
pub mod passport_manager;
pub mod recognition_recorder;
pub mod value_estimator;

pub use catalog_resolver::DeviceDescriptor;
pub use diagnosis_writer::{DiagnosisSeed, WrittenDiagnosis};
pub use identity_resolver::{IdentityResolver, OAuthProfile, RegisterRequest};
pub use passport_manager::PassportManager;
pub use recognition_recorder::{IngestOutcome, RecognitionRecorder, RecognitionSubmission};
pub use value_estimator::ValueBreakdown;
