// src/models/health.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthServer {
    pub address: String,
    pub environment: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    /// `ok` ou `degraded`
    #[schema(example = "ok")]
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    #[schema(example = "bovicontrol-backend")]
    pub service: &'static str,
    pub version: &'static str,
    /// Segundos desde o boot
    pub uptime: u64,
    /// `connected` ou `disconnected`
    pub database: &'static str,
    pub server: HealthServer,
}
