//! Service health report

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339 timestamp of the report
    pub timestamp: String,
    pub travel_module: bool,
    pub chatbot_module: bool,
    pub version: String,
    /// Seconds since the server started
    pub uptime: f64,
    pub environment: String,
}
