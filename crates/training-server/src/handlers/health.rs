//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::db::pool::health_check as db_health_check;
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Health status ("ok" or "unhealthy")
    pub status: String,
}

/// Detailed health check response for the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealthResponse {
    /// Overall health status
    pub status: String,

    /// Database connectivity status
    pub database: String,

    /// Schema holding the training tables
    pub schema: String,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Server version
    pub version: String,
}

/// Basic health check endpoint.
///
/// `GET /health`
///
/// Suitable for load balancer probes: no auth, no database access.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}

/// Detailed API health check endpoint.
///
/// `GET /api/health`
///
/// # Returns
///
/// - `200 OK` when the database answers
/// - `503 Service Unavailable` otherwise
pub async fn api_health(State(state): State<AppState>) -> (StatusCode, Json<ApiHealthResponse>) {
    let db_healthy = db_health_check(&state.db).await;

    let (status_code, status, database) = if db_healthy {
        (StatusCode::OK, "ok", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
    };

    let response = ApiHealthResponse {
        status: status.to_string(),
        database: database.to_string(),
        schema: state.config.schema.clone(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.status, "ok");
    }

    #[test]
    fn test_api_health_serialization() {
        let response = ApiHealthResponse {
            status: "unhealthy".to_string(),
            database: "disconnected".to_string(),
            schema: "training".to_string(),
            uptime_seconds: 12,
            version: "0.4.2".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["database"], "disconnected");
        assert_eq!(json["uptime_seconds"], 12);
    }
}
