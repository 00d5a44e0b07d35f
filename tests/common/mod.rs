use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use coop_energy_api::{
    app_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    logging,
    workflow::{Clock, FixedClock},
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// Decoded response of a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn id(&self) -> Uuid {
        self.body["data"]["id"]
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .expect("response carries a record id")
    }
}

/// Application wired against a throwaway SQLite file and a pinned clock.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub actor: Uuid,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = db_dir.path().join("coop_energy_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let clock = Arc::new(
            FixedClock::at_rfc3339("2026-03-01T09:00:00Z").expect("valid test instant"),
        );
        let state = AppState::new(
            Arc::new(pool),
            cfg,
            event_sender,
            clock.clone() as Arc<dyn Clock>,
            logging::discard_logger(),
        )
        .expect("valid test state");

        Self {
            router: app_router(state.clone()),
            state,
            clock,
            actor: Uuid::new_v4(),
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Sends a request with optional JSON body and extra headers.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("router error during test request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, &[]).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), &[]).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), &[]).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None, &[]).await
    }

    /// POST on behalf of the default test actor.
    pub async fn post_as_actor(&self, uri: &str, body: Option<Value>) -> TestResponse {
        let actor = self.actor.to_string();
        self.request(Method::POST, uri, body, &[(ACTOR_HEADER, actor.as_str())])
            .await
    }

    pub async fn create_zone(&self, name: &str, postal_code: &str, production: f64) -> Uuid {
        let response = self
            .post(
                "/api/v1/energy-zone-summaries",
                json!({
                    "zone_name": name,
                    "postal_code": postal_code,
                    "estimated_production_kwh_day": production,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.id()
    }

    pub async fn create_bond(&self, title: &str) -> Uuid {
        let response = self
            .post(
                "/api/v1/energy-bonds",
                json!({
                    "title": title,
                    "nominal_amount": 5000,
                    "interest_rate": 3.5,
                    "term_months": 24,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.id()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
