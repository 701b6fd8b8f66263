//! # Data Models
//!
//! This module contains all the data models used throughout the Opérateurs Bio API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod operateur;

pub use operateur::Entity as Operateur;

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
            service: "operateurs-bio".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
