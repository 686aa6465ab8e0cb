//! # DVP Common Library
//!
//! Shared code for the device passport backend:
//! - Database initialization and schema
//! - Error types
//! - Configuration loading
//! - Credential hashing helpers

pub mod auth;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
