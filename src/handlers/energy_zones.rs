use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::{
    ok, paginated, ApiJson, ApiPath, ApiQuery, ApiResult, OptionalActor,
};
use super::resources::crud_routes;
use crate::db::ListQuery;
use crate::entities::energy_zone_movement;
use crate::resources::energy_zones::EnergyZoneResponse;
use crate::resources::EnergyZones;
use crate::services::energy_zones::{EnergyMovementRequest, SystemSummary};
use crate::AppState;

/// CRUD plus the capacity operations of `/energy-zone-summaries`.
pub fn energy_zone_routes() -> Router<AppState> {
    crud_routes::<EnergyZones>()
        .route("/system-summary", get(system_summary))
        .route("/postal-code/:postal_code", get(by_postal_code))
        .route("/:id/reserve-energy", post(reserve_energy))
        .route("/:id/release-energy", post(release_energy))
        .route("/:id/update-status", post(update_status))
        .route("/:id/movements", get(movements))
}

async fn reserve_energy(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    OptionalActor(actor): OptionalActor,
    ApiJson(request): ApiJson<EnergyMovementRequest>,
) -> ApiResult<EnergyZoneResponse> {
    let zone = state
        .services
        .zones
        .reserve_energy(id, request, actor)
        .await?;
    Ok(ok("Energy reserved", zone.into()))
}

async fn release_energy(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    OptionalActor(actor): OptionalActor,
    ApiJson(request): ApiJson<EnergyMovementRequest>,
) -> ApiResult<EnergyZoneResponse> {
    let zone = state
        .services
        .zones
        .release_energy(id, request, actor)
        .await?;
    Ok(ok("Energy released", zone.into()))
}

/// Recomputes the derived figures and status from the stored ledger.
async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<EnergyZoneResponse> {
    let zone = state.services.zones.refresh_status(id).await?;
    Ok(ok("Energy zone status updated", zone.into()))
}

async fn system_summary(State(state): State<AppState>) -> ApiResult<SystemSummary> {
    let summary = state.services.zones.system_summary().await?;
    Ok(ok("System summary retrieved", summary))
}

async fn by_postal_code(
    State(state): State<AppState>,
    ApiPath(postal_code): ApiPath<String>,
) -> ApiResult<Vec<EnergyZoneResponse>> {
    let zones = state.services.zones.find_by_postal_code(&postal_code).await?;
    Ok(ok(
        format!("Energy zones for postal code {} retrieved", postal_code.trim()),
        zones.into_iter().map(EnergyZoneResponse::from).collect(),
    ))
}

async fn movements(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<energy_zone_movement::Model>> {
    let page = state.services.zones.movements(id, &query).await?;
    Ok(paginated("Energy movements retrieved", page))
}
