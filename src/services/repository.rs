//! Generic create/read/update/delete, listing and statistics for any resource table.
//!
//! A resource describes itself through [`CrudResource`]: its entity, typed payloads, typed
//! filter object, searchable columns and aggregation whitelist. [`ResourceService`] then
//! provides every operation once for all of them.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, FromQueryResult, IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, SqlErr,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use slog::Logger;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::aggregation::{self, AggregateBucket, AggregateParams, AggregateSchema};
use crate::db::{DbPool, ListQuery, Page, SearchBuilder, SortOrder};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::services::zone_ledger::Thresholds;
use crate::services::ServiceSettings;
use crate::workflow::Clock;

/// Values a resource needs while building a row: the write instant and the zone policy.
#[derive(Debug, Clone, Copy)]
pub struct WriteContext {
    pub now: DateTime<Utc>,
    pub thresholds: Thresholds,
}

/// Binds a table to the generic repository.
pub trait CrudResource: Send + Sync + 'static {
    type Entity: EntityTrait<
        Model = Self::Model,
        ActiveModel = Self::ActiveModel,
        Column = Self::Column,
    >;
    type Model: ModelTrait<Entity = Self::Entity>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModel>
        + Clone
        + Send
        + Sync
        + 'static;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity>
        + ActiveModelBehavior
        + Send
        + 'static;
    type Column: ColumnTrait + FromStr + Send + Sync;
    /// Response body for a single record.
    type View: Serialize + From<Self::Model> + Send;
    type Create: DeserializeOwned + Validate + Send + 'static;
    type Update: DeserializeOwned + Validate + Send + Sync + 'static;
    /// Typed listing filter, read from the query string.
    type Filter: DeserializeOwned + Default + Send + Sync + 'static;

    /// Path segment and event name, e.g. `energy-bonds`.
    const NAME: &'static str;
    /// Singular label used in messages, e.g. `energy bond`.
    const LABEL: &'static str;
    /// Plural label used in messages, e.g. `energy bonds`.
    const PLURAL: &'static str;

    fn id_column() -> Self::Column;
    fn model_id(model: &Self::Model) -> Uuid;
    fn search_columns() -> &'static [Self::Column];
    fn aggregate_schema() -> AggregateSchema<Self::Column>;

    fn default_sort() -> (Self::Column, SortOrder) {
        (Self::aggregate_schema().created_at, SortOrder::Desc)
    }

    fn filter_condition(_filter: &Self::Filter) -> Result<Condition, ServiceError> {
        Ok(Condition::all())
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: Self::Create,
    ) -> Result<Self::ActiveModel, ServiceError>;

    fn apply_update(
        ctx: &WriteContext,
        model: Self::Model,
        input: &Self::Update,
    ) -> Result<Self::ActiveModel, ServiceError>;

    /// Extra `WHERE` clause making an update conditional on the row being unchanged.
    fn version_guard(_model: &Self::Model) -> Option<SimpleExpr> {
        None
    }

    /// Canonical form of a status used in filters, or a field error for unknown values.
    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        Ok(raw.to_string())
    }

    fn created_event(id: Uuid) -> Event {
        Event::ResourceCreated {
            resource: Self::NAME.to_string(),
            id,
        }
    }

    fn updated_event(id: Uuid) -> Event {
        Event::ResourceUpdated {
            resource: Self::NAME.to_string(),
            id,
        }
    }

    fn deleted_event(id: Uuid) -> Event {
        Event::ResourceDeleted {
            resource: Self::NAME.to_string(),
            id,
        }
    }
}

pub fn not_found<R: CrudResource>(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("{} {} not found", capitalize(R::LABEL), id))
}

pub(crate) fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Maps constraint violations raised by a write to client errors.
fn write_error<R: CrudResource>(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(format!(
            "A {} with the same unique value already exists",
            R::LABEL
        )),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => ServiceError::ValidationError(format!(
            "The {} references a record that does not exist",
            R::LABEL
        )),
        _ => ServiceError::DatabaseError(err),
    }
}

/// Loads one row of `R` by id.
pub async fn find_model<R, C>(db: &C, id: Uuid) -> Result<R::Model, ServiceError>
where
    R: CrudResource,
    C: ConnectionTrait,
{
    R::Entity::find()
        .filter(R::id_column().eq(id))
        .one(db)
        .await?
        .ok_or_else(|| not_found::<R>(id))
}

/// Repository operations shared by every resource.
#[derive(Clone)]
pub struct ResourceService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
    logger: Logger,
}

impl ResourceService {
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

    fn context(&self) -> WriteContext {
        WriteContext {
            now: self.clock.now(),
            thresholds: self.settings.thresholds,
        }
    }

    /// Filtered, searched, sorted and paginated listing.
    #[instrument(skip(self, filter, query), fields(resource = R::NAME))]
    pub async fn list<R: CrudResource>(
        &self,
        filter: &R::Filter,
        query: &ListQuery,
    ) -> Result<Page<R::Model>, ServiceError> {
        let db = &*self.db_pool;
        let page = query.page();
        let per_page =
            query.per_page(self.settings.default_page_size, self.settings.max_page_size);

        let mut select = R::Entity::find().filter(R::filter_condition(filter)?);
        if let Some(term) = query.search_term() {
            if let Some(condition) = SearchBuilder::new()
                .add_columns(R::search_columns(), term)
                .build()
            {
                select = select.filter(condition);
            }
        }

        let (default_column, default_order) = R::default_sort();
        let column = query.sort_column(default_column)?;
        let order = query.sort_order.unwrap_or(default_order);
        let select = select
            .order_by(column, order.into())
            .order_by_asc(R::id_column());

        let paginator = select.paginate(db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn get<R: CrudResource>(&self, id: Uuid) -> Result<R::Model, ServiceError> {
        find_model::<R, _>(&*self.db_pool, id).await
    }

    #[instrument(skip(self, input), fields(resource = R::NAME))]
    pub async fn create<R: CrudResource>(&self, input: R::Create) -> Result<R::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let id = Uuid::new_v4();

        let active = R::new_model(&self.context(), id, input)?;
        R::Entity::insert(active)
            .exec_without_returning(db)
            .await
            .map_err(write_error::<R>)?;
        let model = find_model::<R, _>(db, id).await?;

        slog::info!(self.logger, "resource created"; "resource" => R::NAME, "id" => %id);
        self.event_sender.publish(R::created_event(id));
        Ok(model)
    }

    /// Applies `input`, retrying from a fresh read when a guarded write loses a race.
    #[instrument(skip(self, input), fields(resource = R::NAME))]
    pub async fn update<R: CrudResource>(
        &self,
        id: Uuid,
        input: R::Update,
    ) -> Result<R::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;

        for attempt in 1..=self.settings.lock_attempts {
            let current = find_model::<R, _>(db, id).await?;
            let guard = R::version_guard(&current);
            let guarded = guard.is_some();
            let active = R::apply_update(&self.context(), current, &input)?;

            let mut update = R::Entity::update_many()
                .set(active)
                .filter(R::id_column().eq(id));
            if let Some(guard) = guard {
                update = update.filter(guard);
            }

            let result = update.exec(db).await.map_err(write_error::<R>)?;
            if result.rows_affected == 1 {
                let model = find_model::<R, _>(db, id).await?;
                slog::info!(self.logger, "resource updated"; "resource" => R::NAME, "id" => %id);
                self.event_sender.publish(R::updated_event(id));
                return Ok(model);
            }
            if !guarded {
                return Err(not_found::<R>(id));
            }

            metrics::record_lock_conflict(R::NAME);
            warn!(resource = R::NAME, %id, attempt, "update lost an optimistic lock race");
        }

        Err(ServiceError::ConcurrentModification(id))
    }

    #[instrument(skip(self), fields(resource = R::NAME))]
    pub async fn delete<R: CrudResource>(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = R::Entity::delete_many()
            .filter(R::id_column().eq(id))
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found::<R>(id));
        }

        slog::info!(self.logger, "resource deleted"; "resource" => R::NAME, "id" => %id);
        self.event_sender.publish(R::deleted_event(id));
        Ok(())
    }

    pub async fn aggregate<R: CrudResource>(
        &self,
        mut params: AggregateParams,
    ) -> Result<Vec<AggregateBucket>, ServiceError> {
        if let Some(raw) = params.status.take() {
            params.status = Some(R::normalize_status(&raw)?);
        }
        let schema = R::aggregate_schema();
        let request = params.resolve(&schema)?;
        aggregation::aggregate::<R::Entity, _>(&*self.db_pool, &schema, request).await
    }
}
