//! Health check shared by the API surface.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Service-level health reporting.
pub struct HealthService;

impl HealthService {
    /// Current health status.
    ///
    /// The service is stateless apart from its store adapters, so health is
    /// a liveness signal for monitoring and load balancers.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "DDS REST API is alive".into(),
        }
    }
}
