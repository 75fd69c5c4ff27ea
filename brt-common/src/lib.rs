//! # BRT Common Library
//!
//! Shared code for the BRT webcam services including:
//! - Error and result types
//! - Line registry (known transit lines)
//! - Observation and prediction models
//! - Bootstrap configuration loading
//! - Database initialization
//! - Timestamp utilities

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod models;
pub mod registry;
pub mod time;

pub use error::{Error, Result};
pub use models::{Observation, ObservationSource, Prediction};
pub use registry::{LineEntry, LineRegistry};
