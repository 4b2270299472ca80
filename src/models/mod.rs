//! # Data Models
//!
//! This module contains the persistent entity models and shared response
//! models used throughout the answer bot service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod tenant;

pub use tenant::Entity as Tenant;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "answerbot".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
