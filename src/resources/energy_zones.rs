use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition, IntoActiveModel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::rules::{assign, assign_nullable, canonical_status, kwh_quantity, not_blank};
use crate::db::AggregateSchema;
use crate::entities::energy_zone_summary::{ActiveModel, Column, Entity, Model, ZoneStatus};
use crate::errors::ServiceError;
use crate::events::Event;
use crate::services::repository::{CrudResource, WriteContext};
use crate::services::zone_ledger::{normalize_kwh, Ledger};

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateEnergyZoneRequest {
    #[validate(
        length(min = 1, max = 255, message = "The zone name must be between 1 and 255 characters."),
        custom = "not_blank"
    )]
    pub zone_name: String,
    #[validate(length(min = 3, max = 12, message = "The postal code must be between 3 and 12 characters."))]
    pub postal_code: String,
    pub municipality_id: Option<Uuid>,
    #[validate(custom = "kwh_quantity")]
    pub estimated_production_kwh_day: Decimal,
    #[serde(default)]
    #[validate(custom = "kwh_quantity")]
    pub reserved_kwh_day: Decimal,
    #[serde(default)]
    #[validate(custom = "kwh_quantity")]
    pub requested_kwh_day: Decimal,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateEnergyZoneRequest {
    #[validate(
        length(min = 1, max = 255, message = "The zone name must be between 1 and 255 characters."),
        custom = "not_blank"
    )]
    pub zone_name: Option<String>,
    #[validate(length(min = 3, max = 12, message = "The postal code must be between 3 and 12 characters."))]
    pub postal_code: Option<String>,
    pub municipality_id: Option<Uuid>,
    #[validate(custom = "kwh_quantity")]
    pub estimated_production_kwh_day: Option<Decimal>,
    #[validate(custom = "kwh_quantity")]
    pub reserved_kwh_day: Option<Decimal>,
    #[validate(custom = "kwh_quantity")]
    pub requested_kwh_day: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnergyZoneFilter {
    pub status: Option<String>,
    pub postal_code: Option<String>,
    pub municipality_id: Option<Uuid>,
    pub min_available_kwh: Option<Decimal>,
}

/// Zone as returned by the API, with the presentation percentages.
#[derive(Debug, Clone, Serialize)]
pub struct EnergyZoneResponse {
    pub id: Uuid,
    pub zone_name: String,
    pub postal_code: String,
    pub municipality_id: Option<Uuid>,
    pub estimated_production_kwh_day: Decimal,
    pub reserved_kwh_day: Decimal,
    pub requested_kwh_day: Decimal,
    pub available_kwh_day: Decimal,
    pub utilization_percentage: Decimal,
    pub demand_percentage: Decimal,
    pub status: String,
    pub version: i32,
    pub last_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for EnergyZoneResponse {
    fn from(model: Model) -> Self {
        let ledger = model.ledger();
        let status = model
            .status
            .parse::<ZoneStatus>()
            .map(|status| status.to_string())
            .unwrap_or(model.status);
        Self {
            id: model.id,
            zone_name: model.zone_name,
            postal_code: model.postal_code,
            municipality_id: model.municipality_id,
            estimated_production_kwh_day: ledger.production,
            reserved_kwh_day: ledger.reserved,
            requested_kwh_day: ledger.requested,
            available_kwh_day: ledger.available(),
            utilization_percentage: ledger.utilization_percentage(),
            demand_percentage: ledger.demand_percentage(),
            status,
            version: model.version,
            last_updated_at: model.last_updated_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Writes every derived column from `ledger` onto `active`.
fn apply_ledger(active: &mut ActiveModel, ledger: &Ledger, ctx: &WriteContext) {
    let figures = ledger.recompute(&ctx.thresholds);
    active.estimated_production_kwh_day = Set(ledger.production);
    active.reserved_kwh_day = Set(ledger.reserved);
    active.requested_kwh_day = Set(ledger.requested);
    active.available_kwh_day = Set(figures.available_kwh_day);
    active.status = Set(figures.status.to_string());
    active.last_updated_at = Set(ctx.now);
    active.updated_at = Set(ctx.now);
}

pub struct EnergyZones;

impl CrudResource for EnergyZones {
    type Entity = Entity;
    type Model = Model;
    type ActiveModel = ActiveModel;
    type Column = Column;
    type View = EnergyZoneResponse;
    type Create = CreateEnergyZoneRequest;
    type Update = UpdateEnergyZoneRequest;
    type Filter = EnergyZoneFilter;

    const NAME: &'static str = "energy-zone-summaries";
    const LABEL: &'static str = "energy zone";
    const PLURAL: &'static str = "energy zones";

    fn id_column() -> Column {
        Column::Id
    }

    fn model_id(model: &Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [Column] {
        &[Column::ZoneName, Column::PostalCode]
    }

    fn aggregate_schema() -> AggregateSchema<Column> {
        AggregateSchema {
            created_at: Column::CreatedAt,
            status: Some(Column::Status),
            measures: &[
                "estimated_production_kwh_day",
                "reserved_kwh_day",
                "requested_kwh_day",
                "available_kwh_day",
            ],
            dimensions: &["status", "postal_code"],
        }
    }

    fn filter_condition(filter: &EnergyZoneFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition = condition.add(Column::Status.eq(Self::normalize_status(status)?));
        }
        if let Some(postal_code) = &filter.postal_code {
            condition = condition.add(Column::PostalCode.eq(postal_code.trim()));
        }
        if let Some(municipality_id) = filter.municipality_id {
            condition = condition.add(Column::MunicipalityId.eq(municipality_id));
        }
        if let Some(min_available) = filter.min_available_kwh {
            condition = condition.add(Column::AvailableKwhDay.gte(normalize_kwh(min_available)));
        }
        Ok(condition)
    }

    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        canonical_status::<ZoneStatus>(raw, Self::LABEL)
    }

    /// Client-supplied availability and status are never read: both are derived here.
    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateEnergyZoneRequest,
    ) -> Result<ActiveModel, ServiceError> {
        let ledger = Ledger::new(
            input.estimated_production_kwh_day,
            input.reserved_kwh_day,
            input.requested_kwh_day,
        );
        ledger.validate()?;

        let mut active = ActiveModel {
            id: Set(id),
            zone_name: Set(input.zone_name.trim().to_string()),
            postal_code: Set(input.postal_code.trim().to_string()),
            municipality_id: Set(input.municipality_id),
            version: Set(1),
            created_at: Set(ctx.now),
            ..Default::default()
        };
        apply_ledger(&mut active, &ledger, ctx);
        Ok(active)
    }

    fn apply_update(
        ctx: &WriteContext,
        model: Model,
        input: &UpdateEnergyZoneRequest,
    ) -> Result<ActiveModel, ServiceError> {
        let current = model.ledger();
        let ledger = Ledger::new(
            input.estimated_production_kwh_day.unwrap_or(current.production),
            input.reserved_kwh_day.unwrap_or(current.reserved),
            input.requested_kwh_day.unwrap_or(current.requested),
        );
        ledger.validate()?;

        let version = model.version;
        let mut active = model.into_active_model();
        assign(
            &mut active.zone_name,
            &input.zone_name.as_ref().map(|name| name.trim().to_string()),
        );
        assign(
            &mut active.postal_code,
            &input.postal_code.as_ref().map(|code| code.trim().to_string()),
        );
        assign_nullable(&mut active.municipality_id, &input.municipality_id);
        active.version = Set(version + 1);
        apply_ledger(&mut active, &ledger, ctx);
        Ok(active)
    }

    fn version_guard(model: &Model) -> Option<SimpleExpr> {
        Some(Column::Version.eq(model.version))
    }

    fn created_event(id: Uuid) -> Event {
        Event::ZoneCreated(id)
    }

    fn updated_event(id: Uuid) -> Event {
        Event::ZoneUpdated(id)
    }

    fn deleted_event(id: Uuid) -> Event {
        Event::ZoneDeleted(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::zone_ledger::Thresholds;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use sea_orm::ActiveValue;

    fn ctx() -> WriteContext {
        WriteContext {
            now: Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap(),
            thresholds: Thresholds::default(),
        }
    }

    fn create_request() -> CreateEnergyZoneRequest {
        CreateEnergyZoneRequest {
            zone_name: " Centro ".to_string(),
            postal_code: "28001".to_string(),
            municipality_id: None,
            estimated_production_kwh_day: dec!(100),
            reserved_kwh_day: dec!(75),
            requested_kwh_day: dec!(120),
        }
    }

    fn stored(active: ActiveModel) -> Model {
        let ctx = ctx();
        let value = |v: ActiveValue<Decimal>| v.unwrap();
        Model {
            id: active.id.unwrap(),
            zone_name: active.zone_name.unwrap(),
            postal_code: active.postal_code.unwrap(),
            municipality_id: active.municipality_id.unwrap(),
            estimated_production_kwh_day: value(active.estimated_production_kwh_day),
            reserved_kwh_day: value(active.reserved_kwh_day),
            requested_kwh_day: value(active.requested_kwh_day),
            available_kwh_day: value(active.available_kwh_day),
            status: active.status.unwrap(),
            version: active.version.unwrap(),
            last_updated_at: ctx.now,
            created_at: ctx.now,
            updated_at: ctx.now,
        }
    }

    #[test]
    fn create_derives_availability_and_status() {
        let active = EnergyZones::new_model(&ctx(), Uuid::new_v4(), create_request()).unwrap();
        let model = stored(active);
        assert_eq!(model.zone_name, "Centro");
        assert_eq!(model.available_kwh_day, dec!(25));
        assert_eq!(model.status, "amber");
        assert_eq!(model.version, 1);
    }

    #[test]
    fn create_rejects_reserved_above_production() {
        let mut request = create_request();
        request.reserved_kwh_day = dec!(101);
        let err = EnergyZones::new_model(&ctx(), Uuid::new_v4(), request).unwrap_err();
        assert_matches!(err, ServiceError::ValidationFailed(fields) => {
            assert!(fields.contains_key("reserved_kwh_day"));
        });
    }

    #[test]
    fn update_recomputes_and_bumps_version() {
        let model = stored(EnergyZones::new_model(&ctx(), Uuid::new_v4(), create_request()).unwrap());
        let update = UpdateEnergyZoneRequest {
            estimated_production_kwh_day: Some(dec!(200)),
            ..Default::default()
        };
        let active = EnergyZones::apply_update(&ctx(), model, &update).unwrap();
        let updated = stored(active);
        assert_eq!(updated.available_kwh_day, dec!(125));
        assert_eq!(updated.status, "green");
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn response_reports_percentages() {
        let model = stored(EnergyZones::new_model(&ctx(), Uuid::new_v4(), create_request()).unwrap());
        let view = EnergyZoneResponse::from(model);
        assert_eq!(view.utilization_percentage, dec!(75));
        assert_eq!(view.demand_percentage, dec!(120));
    }

    #[test]
    fn legacy_status_filters_are_normalized() {
        assert_eq!(EnergyZones::normalize_status("naranja").unwrap(), "amber");
        assert!(EnergyZones::normalize_status("purple").is_err());
    }
}
