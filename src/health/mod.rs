/*!
 * # Health Check Module
 *
 * Endpoints used by load balancers and orchestrators:
 *
 * - Basic health check (`/health`): process status, version and uptime
 * - Liveness check (`/health/live`): the process answers requests
 * - Readiness check (`/health/ready`): the database answers a ping
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::ApiResponse;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ReadinessInfo {
    pub ready: bool,
    pub database: HealthStatus,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DatabaseConnection>,
    pub started_at: Instant,
}

impl HealthState {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self {
            db_pool,
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Pings the database, reporting how long the round trip took.
    pub async fn check_database(&self) -> (HealthStatus, Duration) {
        let start = Instant::now();
        let status = match self.db_pool.ping().await {
            Ok(()) => HealthStatus::Up,
            Err(e) => {
                error!(error = %e, "database health check failed");
                HealthStatus::Down
            }
        };
        (status, start.elapsed())
    }
}

fn respond<T: Serialize>(status: HealthStatus, message: &str, data: T) -> impl IntoResponse {
    let mut body = ApiResponse::success(data);
    body.message = message.to_string();
    body.success = status == HealthStatus::Up;
    (status.status_code(), Json(body))
}

/// Basic health check endpoint
pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("health check endpoint called");
    let (database, _) = state.check_database().await;
    let info = HealthInfo {
        status: database,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime().as_secs(),
        timestamp: Utc::now(),
    };
    respond(database, "Service health", info)
}

/// Liveness check endpoint
pub async fn liveness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let info = HealthInfo {
        status: HealthStatus::Up,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime().as_secs(),
        timestamp: Utc::now(),
    };
    respond(HealthStatus::Up, "Service is alive", info)
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let (database, latency) = state.check_database().await;
    let info = ReadinessInfo {
        ready: database == HealthStatus::Up,
        database,
        latency_ms: latency.as_millis() as u64,
        timestamp: Utc::now(),
    };
    let message = if info.ready {
        "Service is ready"
    } else {
        "Service is not ready"
    };
    respond(database, message, info)
}

/// Router mounted at `/health`.
pub fn health_routes(db_pool: Arc<DatabaseConnection>) -> Router {
    let state = Arc::new(HealthState::new(db_pool));
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
        .route("/ready", get(readiness_check))
        .with_state(state)
}
