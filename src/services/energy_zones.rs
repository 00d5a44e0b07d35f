//! Reservation service for energy zones.
//!
//! Every mutation reads the zone, asks the [`Ledger`] for the next figures and writes them
//! with `WHERE version = ?`. A lost race rolls the transaction back and starts again from a
//! fresh read, so two concurrent reservations can never both spend the same capacity. The
//! row is claimed for writing before it is read, and a write refused by a locked store is
//! retried like a lost race.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::transaction::{claim_row, is_lock_contention, retry_backoff};
use crate::db::{with_transaction, DbPool, ListQuery, Page};
use crate::entities::energy_zone_movement::{self, MovementKind};
use crate::entities::energy_zone_summary::{self, ZoneStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::services::zone_ledger::{normalize_kwh, Ledger, Thresholds};
use crate::services::ServiceSettings;
use crate::workflow::{Actor, Clock};

const RESOURCE: &str = "energy-zone-summaries";

/// Body of `reserve-energy` and `release-energy`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EnergyMovementRequest {
    pub kwh: Decimal,
    #[validate(length(max = 1000, message = "The note may not be greater than 1000 characters."))]
    pub note: Option<String>,
}

/// Network-wide totals across every zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSummary {
    pub total_zones: u64,
    pub zones_by_status: BTreeMap<String, u64>,
    pub total_estimated_production_kwh_day: Decimal,
    pub total_reserved_kwh_day: Decimal,
    pub total_requested_kwh_day: Decimal,
    pub total_available_kwh_day: Decimal,
    pub overall_utilization_percentage: Decimal,
    pub overall_demand_percentage: Decimal,
}

#[derive(Debug, FromQueryResult)]
struct StatusTotals {
    status: String,
    zones: i64,
    production: Option<f64>,
    reserved: Option<f64>,
    requested: Option<f64>,
    available: Option<f64>,
}

fn kwh_from_f64(value: Option<f64>) -> Result<Decimal, ServiceError> {
    let value = value.unwrap_or(0.0);
    Decimal::try_from(value)
        .map(normalize_kwh)
        .map_err(|e| ServiceError::InternalError(format!("kWh total {} out of range: {}", value, e)))
}

/// Result of a guarded zone write.
struct ZoneWrite {
    before: energy_zone_summary::Model,
    after: energy_zone_summary::Model,
}

#[derive(Clone)]
pub struct EnergyZoneService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
    logger: Logger,
}

pub async fn find_zone<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<energy_zone_summary::Model, ServiceError> {
    energy_zone_summary::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Energy zone {} not found", id)))
}

impl EnergyZoneService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
        logger: Logger,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            clock,
            settings,
            logger,
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.settings.thresholds
    }

    /// Commits `kwh` of the zone's available capacity. All-or-nothing.
    #[instrument(skip(self, request), fields(zone_id = %id))]
    pub async fn reserve_energy(
        &self,
        id: Uuid,
        request: EnergyMovementRequest,
        actor: Option<Actor>,
    ) -> Result<energy_zone_summary::Model, ServiceError> {
        self.move_energy(id, MovementKind::Reserve, request, actor)
            .await
    }

    /// Returns `kwh` of reserved capacity to the zone.
    #[instrument(skip(self, request), fields(zone_id = %id))]
    pub async fn release_energy(
        &self,
        id: Uuid,
        request: EnergyMovementRequest,
        actor: Option<Actor>,
    ) -> Result<energy_zone_summary::Model, ServiceError> {
        self.move_energy(id, MovementKind::Release, request, actor)
            .await
    }

    async fn move_energy(
        &self,
        id: Uuid,
        kind: MovementKind,
        request: EnergyMovementRequest,
        actor: Option<Actor>,
    ) -> Result<energy_zone_summary::Model, ServiceError> {
        let operation = kind.as_ref();
        if let Err(err) = request.validate() {
            metrics::record_reservation(operation, "rejected");
            return Err(err.into());
        }
        let kwh = normalize_kwh(request.kwh);
        let note = request.note.filter(|note| !note.trim().is_empty());
        let actor_id = actor.map(|actor| actor.id());

        let result = self
            .guarded_write(id, move |zone, now| {
                let ledger = zone.ledger();
                let next = match kind {
                    MovementKind::Reserve => ledger.reserve(kwh)?,
                    MovementKind::Release => ledger.release(kwh)?,
                };
                let movement = energy_zone_movement::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    zone_id: Set(id),
                    kind: Set(kind.to_string()),
                    kwh: Set(kwh),
                    reserved_before: Set(ledger.reserved),
                    reserved_after: Set(next.reserved),
                    actor_id: Set(actor_id),
                    note: Set(note.clone()),
                    created_at: Set(now),
                };
                Ok((next, Some(movement)))
            })
            .await;

        let write = match result {
            Ok(write) => write,
            Err(err) => {
                let outcome = match err {
                    ServiceError::CapacityShortage(_) => "shortage",
                    ServiceError::ConcurrentModification(_) => "conflict",
                    _ => "rejected",
                };
                metrics::record_reservation(operation, outcome);
                return Err(err);
            }
        };

        metrics::record_reservation(operation, "applied");
        metrics::record_kwh_moved(operation, kwh.to_f64().unwrap_or(0.0));
        slog::info!(self.logger, "zone capacity moved";
            "zone_id" => %id,
            "operation" => operation,
            "kwh" => %kwh,
            "reserved_kwh_day" => %write.after.reserved_kwh_day,
            "available_kwh_day" => %write.after.available_kwh_day);

        let event = match kind {
            MovementKind::Reserve => Event::EnergyReserved {
                zone_id: id,
                kwh,
                available_kwh_day: write.after.available_kwh_day,
                actor_id,
            },
            MovementKind::Release => Event::EnergyReleased {
                zone_id: id,
                kwh,
                available_kwh_day: write.after.available_kwh_day,
                actor_id,
            },
        };
        self.event_sender.publish(event);
        self.publish_status_change(&write);

        Ok(write.after)
    }

    /// Recomputes and persists the derived fields of a zone without touching its inputs.
    #[instrument(skip(self), fields(zone_id = %id))]
    pub async fn refresh_status(&self, id: Uuid) -> Result<energy_zone_summary::Model, ServiceError> {
        let write = self
            .guarded_write(id, |zone, _now| Ok((zone.ledger(), None)))
            .await?;
        self.publish_status_change(&write);
        Ok(write.after)
    }

    /// Runs `plan` against a fresh read of the zone and stores its ledger with a version
    /// guard, retrying on conflict.
    async fn guarded_write<F>(&self, id: Uuid, plan: F) -> Result<ZoneWrite, ServiceError>
    where
        F: Fn(
                &energy_zone_summary::Model,
                DateTime<Utc>,
            ) -> Result<(Ledger, Option<energy_zone_movement::ActiveModel>), ServiceError>
            + Clone
            + Send
            + Sync
            + 'static,
    {
        let db = &*self.db_pool;
        let thresholds = self.settings.thresholds;
        let attempts = self.settings.lock_attempts;

        for attempt in 1..=attempts {
            let now = self.clock.now();
            let plan = plan.clone();
            let outcome = with_transaction(db, move |txn| {
                Box::pin(async move {
                    claim_row::<energy_zone_summary::Entity>(
                        txn,
                        energy_zone_summary::Column::Id,
                        energy_zone_summary::Column::Version,
                        id,
                    )
                    .await?;
                    let before = find_zone(txn, id).await?;
                    let (ledger, movement) = plan(&before, now)?;
                    let figures = ledger.recompute(&thresholds);

                    let updated = energy_zone_summary::Entity::update_many()
                        .set(energy_zone_summary::ActiveModel {
                            estimated_production_kwh_day: Set(ledger.production),
                            reserved_kwh_day: Set(ledger.reserved),
                            requested_kwh_day: Set(ledger.requested),
                            available_kwh_day: Set(figures.available_kwh_day),
                            status: Set(figures.status.to_string()),
                            version: Set(before.version + 1),
                            last_updated_at: Set(now),
                            updated_at: Set(now),
                            ..Default::default()
                        })
                        .filter(energy_zone_summary::Column::Id.eq(id))
                        .filter(energy_zone_summary::Column::Version.eq(before.version))
                        .exec(txn)
                        .await?;
                    if updated.rows_affected == 0 {
                        return Ok(None);
                    }

                    if let Some(movement) = movement {
                        energy_zone_movement::Entity::insert(movement)
                            .exec_without_returning(txn)
                            .await?;
                    }

                    let after = find_zone(txn, id).await?;
                    Ok(Some(ZoneWrite { before, after }))
                })
            })
            .await;

            match outcome {
                Ok(Some(write)) => return Ok(write),
                Ok(None) => {
                    metrics::record_lock_conflict(RESOURCE);
                    warn!(zone_id = %id, attempt, "zone write lost an optimistic lock race");
                }
                Err(err) if is_lock_contention(&err) => {
                    metrics::record_lock_conflict(RESOURCE);
                    warn!(zone_id = %id, attempt, error = %err, "zone write refused by a locked database");
                }
                Err(err) => return Err(err),
            }
            if attempt < attempts {
                retry_backoff(attempt).await;
            }
        }

        Err(ServiceError::ConcurrentModification(id))
    }

    fn publish_status_change(&self, write: &ZoneWrite) {
        if write.before.status != write.after.status {
            slog::info!(self.logger, "zone status changed";
                "zone_id" => %write.after.id,
                "from" => &write.before.status,
                "to" => &write.after.status);
            self.event_sender.publish(Event::ZoneStatusChanged {
                zone_id: write.after.id,
                old_status: write.before.status.clone(),
                new_status: write.after.status.clone(),
            });
        }
    }

    /// Zone counts per status and capacity totals over the whole network.
    pub async fn system_summary(&self) -> Result<SystemSummary, ServiceError> {
        use energy_zone_summary::Column;

        fn total(column: Column) -> SimpleExpr {
            Func::cast_as(
                Func::sum(Expr::col((energy_zone_summary::Entity, column))),
                Alias::new("DOUBLE PRECISION"),
            )
            .into()
        }

        let rows = energy_zone_summary::Entity::find()
            .select_only()
            .column(Column::Status)
            .column_as(
                SimpleExpr::from(Func::count(Expr::col((energy_zone_summary::Entity, Column::Id)))),
                "zones",
            )
            .column_as(total(Column::EstimatedProductionKwhDay), "production")
            .column_as(total(Column::ReservedKwhDay), "reserved")
            .column_as(total(Column::RequestedKwhDay), "requested")
            .column_as(total(Column::AvailableKwhDay), "available")
            .group_by(Column::Status)
            .into_model::<StatusTotals>()
            .all(&*self.db_pool)
            .await?;

        let mut zones_by_status: BTreeMap<String, u64> = ZoneStatus::ALL
            .iter()
            .map(|status| (status.to_string(), 0))
            .collect();
        let mut total_zones = 0u64;
        let (mut production, mut reserved, mut requested, mut available) =
            (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);

        for row in rows {
            let key = row
                .status
                .parse::<ZoneStatus>()
                .map(|status| status.to_string())
                .unwrap_or(row.status);
            let count = u64::try_from(row.zones).unwrap_or(0);
            *zones_by_status.entry(key).or_default() += count;
            total_zones += count;
            production += kwh_from_f64(row.production)?;
            reserved += kwh_from_f64(row.reserved)?;
            requested += kwh_from_f64(row.requested)?;
            available += kwh_from_f64(row.available)?;
        }

        let overall = Ledger::new(production, reserved, requested);
        Ok(SystemSummary {
            total_zones,
            zones_by_status,
            total_estimated_production_kwh_day: overall.production,
            total_reserved_kwh_day: overall.reserved,
            total_requested_kwh_day: overall.requested,
            total_available_kwh_day: normalize_kwh(available),
            overall_utilization_percentage: overall.utilization_percentage(),
            overall_demand_percentage: overall.demand_percentage(),
        })
    }

    pub async fn find_by_postal_code(
        &self,
        postal_code: &str,
    ) -> Result<Vec<energy_zone_summary::Model>, ServiceError> {
        let zones = energy_zone_summary::Entity::find()
            .filter(energy_zone_summary::Column::PostalCode.eq(postal_code.trim()))
            .order_by_asc(energy_zone_summary::Column::ZoneName)
            .all(&*self.db_pool)
            .await?;
        Ok(zones)
    }

    /// Capacity movements of a zone, newest first.
    pub async fn movements(
        &self,
        id: Uuid,
        query: &ListQuery,
    ) -> Result<Page<energy_zone_movement::Model>, ServiceError> {
        let db = &*self.db_pool;
        find_zone(db, id).await?;

        let page = query.page();
        let per_page =
            query.per_page(self.settings.default_page_size, self.settings.max_page_size);
        let paginator = energy_zone_movement::Entity::find()
            .filter(energy_zone_movement::Column::ZoneId.eq(id))
            .order_by_desc(energy_zone_movement::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }
}
