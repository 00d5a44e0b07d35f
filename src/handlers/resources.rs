//! Routers shared by every table-backed resource.
//!
//! `crud_routes::<R>()` serves listing, statistics and single-record CRUD for any
//! [`CrudResource`]; `workflow_routes::<R>()` adds the named transitions and their audit
//! trail for resources whose status is workflow-managed.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::common::{
    created, ok, paginated, ApiJson, ApiPath, ApiQuery, ApiResult, CreatedResult,
    RequiredActor, TransitionBody,
};
use crate::db::{AggregateBucket, AggregateParams, ListQuery};
use crate::entities::workflow_transition;
use crate::errors::ServiceError;
use crate::services::repository::{capitalize, CrudResource};
use crate::services::workflow::WorkflowResource;
use crate::workflow::WorkflowAction;
use crate::{ApiResponse, AppState};

pub fn crud_routes<R: CrudResource>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/stats", get(stats::<R>))
        .route("/:id", get(show::<R>).put(update::<R>).delete(destroy::<R>))
}

pub fn workflow_routes<R: WorkflowResource>() -> Router<AppState> {
    crud_routes::<R>()
        .route("/:id/transitions", get(transitions::<R>))
        .route("/:id/:action", post(transition::<R>))
}

async fn list<R: CrudResource>(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
    ApiQuery(filter): ApiQuery<R::Filter>,
) -> ApiResult<Vec<R::View>> {
    let page = state.services.resources.list::<R>(&filter, &query).await?;
    Ok(paginated(
        format!("{} retrieved", capitalize(R::PLURAL)),
        page.map(R::View::from),
    ))
}

async fn show<R: CrudResource>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<R::View> {
    let model = state.services.resources.get::<R>(id).await?;
    Ok(ok(
        format!("{} retrieved", capitalize(R::LABEL)),
        R::View::from(model),
    ))
}

async fn create<R: CrudResource>(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<R::Create>,
) -> CreatedResult<R::View> {
    let model = state.services.resources.create::<R>(input).await?;
    Ok(created(
        format!("{} created", capitalize(R::LABEL)),
        R::View::from(model),
    ))
}

async fn update<R: CrudResource>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<R::Update>,
) -> ApiResult<R::View> {
    let model = state.services.resources.update::<R>(id, input).await?;
    Ok(ok(
        format!("{} updated", capitalize(R::LABEL)),
        R::View::from(model),
    ))
}

async fn destroy<R: CrudResource>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    state.services.resources.delete::<R>(id).await?;
    Ok(Json(ApiResponse::empty(format!(
        "{} deleted",
        capitalize(R::LABEL)
    ))))
}

async fn stats<R: CrudResource>(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<AggregateParams>,
) -> ApiResult<Vec<AggregateBucket>> {
    let buckets = state.services.resources.aggregate::<R>(params).await?;
    Ok(ok(
        format!("{} statistics retrieved", capitalize(R::LABEL)),
        buckets,
    ))
}

async fn transition<R: WorkflowResource>(
    State(state): State<AppState>,
    ApiPath((id, action)): ApiPath<(Uuid, String)>,
    RequiredActor(actor): RequiredActor,
    TransitionBody(request): TransitionBody,
) -> ApiResult<R::View> {
    let action: WorkflowAction = action.parse().map_err(|_| {
        ServiceError::NotFound(format!(
            "{} do not support the '{}' action",
            R::PLURAL,
            action
        ))
    })?;

    let model = state
        .services
        .workflow
        .transition::<R>(id, action, actor, request)
        .await?;
    Ok(ok(
        format!("{} {}", capitalize(R::LABEL), action.past_participle()),
        R::View::from(model),
    ))
}

async fn transitions<R: WorkflowResource>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Vec<workflow_transition::Model>> {
    let rows = state.services.workflow.transitions::<R>(id).await?;
    Ok(ok(
        format!("{} transitions retrieved", capitalize(R::LABEL)),
        rows,
    ))
}
