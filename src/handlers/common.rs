use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Query, Request},
    http::{request::Parts, StatusCode},
    response::Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::db::Page;
use crate::errors::ServiceError;
use crate::services::workflow::TransitionRequest;
use crate::workflow::Actor;
use crate::ApiResponse;

/// Header naming the member performing a mutation.
pub const ACTOR_HEADER: &str = "x-actor-id";

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ServiceError>;
pub type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

pub fn ok<T>(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data).with_message(message))
}

pub fn created<T>(message: impl Into<String>, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(message, data))
}

pub fn paginated<T>(message: impl Into<String>, page: Page<T>) -> Json<ApiResponse<Vec<T>>> {
    Json(ApiResponse::paginated(page).with_message(message))
}

fn parse_actor(parts: &Parts) -> Result<Option<Actor>, ServiceError> {
    let Some(raw) = parts.headers.get(ACTOR_HEADER) else {
        return Ok(None);
    };
    raw.to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .map(|id| Some(Actor(id)))
        .ok_or_else(|| {
            ServiceError::Forbidden(format!("The {} header must be a valid UUID", ACTOR_HEADER))
        })
}

/// Acting member, mandatory.
#[derive(Debug, Clone, Copy)]
pub struct RequiredActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for RequiredActor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_actor(parts)?.map(Self).ok_or_else(|| {
            ServiceError::Forbidden(format!(
                "The {} header is required for this action",
                ACTOR_HEADER
            ))
        })
    }
}

/// Acting member when the caller supplied one. A malformed header is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct OptionalActor(pub Option<Actor>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalActor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_actor(parts).map(Self)
    }
}

/// `Json` whose rejections render as envelope errors.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(JsonRejection::JsonDataError(err)) => {
                Err(ServiceError::ValidationError(err.body_text()))
            }
            Err(other) => Err(ServiceError::BadRequest(other.body_text())),
        }
    }
}

pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))
    }
}

pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))
    }
}

/// Transition body; an empty body means no reason and no note.
#[derive(Debug)]
pub struct TransitionBody(pub TransitionRequest);

#[async_trait]
impl<S> FromRequest<S> for TransitionBody
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(TransitionRequest::default()));
        }
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|err| ServiceError::ValidationError(format!("Malformed request body: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(ACTOR_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn required_actor_rejects_missing_header() {
        let mut parts = parts_with(None);
        let err = RequiredActor::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn optional_actor_rejects_malformed_header() {
        let mut parts = parts_with(Some("not-a-uuid"));
        let err = OptionalActor::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let mut parts = parts_with(None);
        let OptionalActor(actor) = OptionalActor::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(actor.is_none());
    }

    #[tokio::test]
    async fn actor_header_is_parsed() {
        let id = Uuid::new_v4();
        let mut parts = parts_with(Some(id.to_string().as_str()));
        let RequiredActor(actor) = RequiredActor::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(actor.id(), id);
    }

    #[tokio::test]
    async fn empty_transition_body_is_default() {
        let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        let TransitionBody(body) = TransitionBody::from_request(req, &()).await.unwrap();
        assert!(body.text().is_none());

        let req = HttpRequest::builder()
            .uri("/")
            .body(Body::from(r#"{"reason":"duplicate"}"#))
            .unwrap();
        let TransitionBody(body) = TransitionBody::from_request(req, &()).await.unwrap();
        assert_eq!(body.text().as_deref(), Some("duplicate"));
    }

    #[tokio::test]
    async fn malformed_transition_body_is_unprocessable() {
        let req = HttpRequest::builder()
            .uri("/")
            .body(Body::from("{reason"))
            .unwrap();
        let err = TransitionBody::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
