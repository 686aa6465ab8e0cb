//! HTTP API handlers for dvp-api
//!
//! Thin glue over the service layer: routes under /api/v1 plus the
//! unprefixed health check.

pub mod auth;
pub mod health;
pub mod passports;
pub mod recognition;

pub use auth::auth_routes;
pub use health::health_routes;
pub use passports::passport_routes;
pub use recognition::recognition_routes;
