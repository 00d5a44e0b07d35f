//! Energy Cooperative API Library
//!
//! Zone capacity ledgers, workflow-managed records and a generic resource layer for an
//! energy cooperative, served over HTTP under `/api/v1`.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod resources;
pub mod services;
pub mod tracing;
pub mod workflow;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::db::{DbPool, Page};
use crate::errors::{FieldErrors, ServiceError};
use crate::handlers::energy_zones::energy_zone_routes;
use crate::handlers::resources::{crud_routes, workflow_routes};
use crate::resources::{
    Articles, CarbonCredits, Donations, EnergyBonds, Faqs, MaintenanceTasks, Municipalities,
    Pages, Products, Providers, SubscriptionRequests, UserSubscriptions,
};
use crate::services::ServiceSettings;
use crate::workflow::Clock;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        db: Arc<DbPool>,
        config: config::AppConfig,
        event_sender: events::EventSender,
        clock: Arc<dyn Clock>,
        logger: Logger,
    ) -> Result<Self, ServiceError> {
        let settings = ServiceSettings::from_config(&config)?;
        let event_sender = Arc::new(event_sender);
        let services = handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            clock.clone(),
            settings,
            logger,
        );

        Ok(Self {
            db,
            config: Arc::new(config),
            event_sender,
            services,
            clock,
        })
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
}

impl<T> ApiResponse<T> {
    fn build(success: bool, message: String, data: Option<T>) -> Self {
        Self {
            success,
            message,
            data,
            errors: None,
            pagination: None,
            meta: ResponseMeta::capture(),
        }
    }

    pub fn success(data: T) -> Self {
        Self::build(true, "OK".to_string(), Some(data))
    }

    /// Successful response without a body, e.g. after a delete.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::build(true, message.into(), None)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::build(false, message.into(), None)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn paginated(page: Page<T>) -> Self {
        let pagination = PaginationMeta {
            current_page: page.page,
            per_page: page.per_page,
            total: page.total,
            last_page: page.last_page(),
        };
        let mut response = Self::success(page.items);
        response.pagination = Some(pagination);
        response
    }
}


/// Every resource router, mounted under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        // Capacity ledger
        .nest("/energy-zone-summaries", energy_zone_routes())
        // Workflow-managed records
        .nest("/energy-bonds", workflow_routes::<EnergyBonds>())
        .nest("/carbon-credits", workflow_routes::<CarbonCredits>())
        .nest("/donations", workflow_routes::<Donations>())
        .nest("/maintenance-tasks", workflow_routes::<MaintenanceTasks>())
        .nest("/user-subscriptions", workflow_routes::<UserSubscriptions>())
        .nest(
            "/subscription-requests",
            workflow_routes::<SubscriptionRequests>(),
        )
        // Content and catalog
        .nest("/articles", crud_routes::<Articles>())
        .nest("/pages", crud_routes::<Pages>())
        .nest("/faqs", crud_routes::<Faqs>())
        .nest("/products", crud_routes::<Products>())
        .nest("/providers", crud_routes::<Providers>())
        .nest("/municipalities", crud_routes::<Municipalities>())
}

/// CORS policy from configuration: explicit origins, else permissive where allowed,
/// else same-origin only.
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// The complete HTTP application: API, health, metrics and the middleware stack.
pub fn app_router(state: AppState) -> Router {
    let config = state.config.clone();
    let health = health::health_routes(state.db.clone());

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .nest("/health", health)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config))
        .layer(axum::middleware::from_fn(
            middleware_helpers::http_metrics_middleware,
        ))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

async fn api_status() -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(status_data).with_message("Service is running"))
}

async fn metrics_endpoint() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => {
            ::tracing::error!(error = %err, "failed to render metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("metrics error"),
            )
        }
    }
}

async fn route_not_found() -> ServiceError {
    ServiceError::NotFound("The requested resource does not exist".to_string())
}
