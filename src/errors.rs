use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::ApiResponse;

/// Field name mapped to the messages describing why it was rejected.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

static EXPOSE_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

/// Controls whether 5xx responses carry the underlying error text.
/// Set once at boot from `AppConfig::expose_error_details`.
pub fn set_expose_error_details(enabled: bool) {
    EXPOSE_ERROR_DETAILS.store(enabled, Ordering::Relaxed);
}

pub fn expose_error_details() -> bool {
    EXPOSE_ERROR_DETAILS.load(Ordering::Relaxed)
}

/// Figures attached to a rejected reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityShortage {
    pub requested: Decimal,
    pub available: Decimal,
    pub shortfall: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("The given data was invalid")]
    ValidationFailed(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Insufficient energy available: requested {}, available {}", .0.requested, .0.available)]
    CapacityShortage(CapacityShortage),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errors) in err.field_errors() {
            let messages = errors
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("The {} field is invalid ({})", field, e.code),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        ServiceError::ValidationFailed(fields)
    }
}

impl ServiceError {
    /// Single-field validation failure, rendered like a validator error.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), vec![message.into()]);
        ServiceError::ValidationFailed(fields)
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::ValidationFailed(_)
            | Self::InvalidTransition(_)
            | Self::CapacityShortage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::NotFound(msg)
            | Self::ValidationError(msg)
            | Self::BadRequest(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg)
            | Self::InvalidTransition(msg) => msg.clone(),
            Self::ConcurrentModification(id) => {
                format!("Record {} was modified concurrently, please retry", id)
            }
            _ => self.to_string(),
        }
    }

    fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::ValidationFailed(fields) => Some(fields.clone()),
            Self::ValidationError(msg) | Self::BadRequest(msg) => {
                let mut fields = FieldErrors::new();
                fields.insert("request".to_string(), vec![msg.clone()]);
                Some(fields)
            }
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::info!(error = %self, status = status.as_u16(), "request rejected");
        }

        let mut body = ApiResponse::<serde_json::Value>::failure(self.response_message());
        body.errors = self.field_errors();

        if let Self::CapacityShortage(shortage) = &self {
            body.data = Some(json!(shortage));
        }

        if status.is_server_error() && expose_error_details() {
            let mut fields = FieldErrors::new();
            fields.insert("debug".to_string(), vec![self.to_string()]);
            body.errors = Some(fields);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rust_decimal_macros::dec;
    use validator::Validate;

    async fn body_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "The title field is required."))]
        title: String,
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::InvalidTransition("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::ConcurrentModification(Uuid::nil()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validator_errors_become_field_map() {
        let err: ServiceError = Probe { title: String::new() }
            .validate()
            .unwrap_err()
            .into();
        match err {
            ServiceError::ValidationFailed(fields) => {
                assert_eq!(fields["title"], vec!["The title field is required."]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn shortage_response_carries_figures() {
        let response = ServiceError::CapacityShortage(CapacityShortage {
            requested: dec!(40.01),
            available: dec!(40),
            shortfall: dec!(0.01),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_of(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["shortfall"], 0.01);
        assert_eq!(body["data"]["available"], 40.0);
    }

    #[tokio::test]
    async fn database_errors_hide_detail_by_default() {
        set_expose_error_details(false);
        let response =
            ServiceError::DatabaseError(DbErr::Custom("relation missing".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body["message"], "Database error");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        let body = body_of(response).await;
        assert_eq!(body["meta"]["request_id"], "req-123");
    }
}
