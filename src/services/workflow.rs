//! Executes planned workflow transitions against the store.
//!
//! The transition itself is decided by [`crate::workflow::plan`]; this service loads the
//! record, applies the stamp through a version-guarded update and writes the audit row in
//! the same transaction. Lost races and writes refused by a locked store are retried.

use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use slog::Logger;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::transaction::{claim_row, is_lock_contention, retry_backoff};
use crate::db::{with_transaction, DbPool};
use crate::entities::workflow_transition;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::services::repository::{find_model, CrudResource};
use crate::services::ServiceSettings;
use crate::workflow::{plan, Actor, Clock, TransitionStamp, WorkflowAction, WorkflowState};

/// A resource whose status only moves through named transitions.
pub trait WorkflowResource: CrudResource {
    type State: WorkflowState;

    fn status_column() -> Self::Column;
    fn version_column() -> Self::Column;
    fn stored_status(model: &Self::Model) -> &str;
    fn version(model: &Self::Model) -> i32;

    /// Row changes for moving `model` to `to`: status, version bump and the action's stamps.
    fn transitioned(model: Self::Model, to: Self::State, stamp: &TransitionStamp) -> Self::ActiveModel;

    fn current_state(model: &Self::Model) -> Result<Self::State, ServiceError> {
        Self::State::parse_stored(Self::stored_status(model))
    }
}

/// Optional body of `POST /{resource}/{id}/{action}`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TransitionRequest {
    #[validate(length(max = 2000, message = "The reason may not be greater than 2000 characters."))]
    pub reason: Option<String>,
    #[validate(length(max = 2000, message = "The note may not be greater than 2000 characters."))]
    pub note: Option<String>,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

impl TransitionRequest {
    /// The non-blank `reason`, if any.
    pub fn reason(&self) -> Option<String> {
        trimmed(self.reason.as_deref())
    }

    /// The free text recorded with the transition; `reason` wins over `note`.
    pub fn text(&self) -> Option<String> {
        self.reason().or_else(|| trimmed(self.note.as_deref()))
    }
}

#[derive(Clone)]
pub struct WorkflowService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
    logger: Logger,
}

impl WorkflowService {
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

    /// Applies `action` to record `id` on behalf of `actor`.
    #[instrument(skip(self, request), fields(resource = R::NAME, action = %action))]
    pub async fn transition<R: WorkflowResource>(
        &self,
        id: Uuid,
        action: WorkflowAction,
        actor: Actor,
        request: TransitionRequest,
    ) -> Result<R::Model, ServiceError> {
        if R::State::rule_for(action).is_none() {
            return Err(ServiceError::NotFound(format!(
                "{} do not support the '{}' action",
                R::PLURAL,
                action
            )));
        }
        request.validate()?;
        let text = if action.requires_reason() {
            let reason = request.reason().ok_or_else(|| {
                ServiceError::field(
                    "reason",
                    format!("A reason is required to {} {}.", action, R::PLURAL),
                )
            })?;
            Some(reason)
        } else {
            request.text()
        };

        let db = &*self.db_pool;
        let attempts = self.settings.lock_attempts;
        for attempt in 1..=attempts {
            let stamp = TransitionStamp::new(action, actor, self.clock.as_ref(), text.clone());
            let outcome = with_transaction(db, move |txn| {
                Box::pin(async move {
                    claim_row::<R::Entity>(txn, R::id_column(), R::version_column(), id).await?;
                    let current = find_model::<R, _>(txn, id).await?;
                    let from = R::current_state(&current)?;
                    let to = plan(from, action, R::PLURAL)?;
                    let version = R::version(&current);

                    let updated = R::Entity::update_many()
                        .set(R::transitioned(current, to, &stamp))
                        .filter(R::id_column().eq(id))
                        .filter(R::version_column().eq(version))
                        .exec(txn)
                        .await?;
                    if updated.rows_affected == 0 {
                        return Ok(None);
                    }

                    workflow_transition::Entity::insert(workflow_transition::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        resource: Set(R::NAME.to_string()),
                        record_id: Set(id),
                        action: Set(action.to_string()),
                        from_status: Set(from.to_string()),
                        to_status: Set(to.to_string()),
                        actor_id: Set(stamp.actor),
                        note: Set(stamp.note.clone()),
                        created_at: Set(stamp.at),
                    })
                    .exec_without_returning(txn)
                    .await?;

                    let model = find_model::<R, _>(txn, id).await?;
                    Ok(Some((model, from, to)))
                })
            })
            .await;

            match outcome {
                Ok(Some((model, from, to))) => {
                    metrics::record_transition(R::NAME, action.as_ref(), "applied");
                    slog::info!(self.logger, "workflow transition";
                        "resource" => R::NAME,
                        "id" => %id,
                        "action" => %action,
                        "from" => %from,
                        "to" => %to,
                        "actor" => %actor.id());
                    self.event_sender.publish(Event::WorkflowTransitioned {
                        resource: R::NAME.to_string(),
                        record_id: id,
                        action: action.to_string(),
                        from_status: from.to_string(),
                        to_status: to.to_string(),
                        actor_id: actor.id(),
                    });
                    return Ok(model);
                }
                Ok(None) => {
                    metrics::record_lock_conflict(R::NAME);
                    warn!(resource = R::NAME, %id, attempt, "transition lost an optimistic lock race");
                }
                Err(err) if is_lock_contention(&err) => {
                    metrics::record_lock_conflict(R::NAME);
                    warn!(resource = R::NAME, %id, attempt, error = %err, "transition refused by a locked database");
                }
                Err(err) => {
                    metrics::record_transition(R::NAME, action.as_ref(), "rejected");
                    return Err(err);
                }
            }
            if attempt < attempts {
                retry_backoff(attempt).await;
            }
        }

        metrics::record_transition(R::NAME, action.as_ref(), "conflict");
        Err(ServiceError::ConcurrentModification(id))
    }

    /// Audit trail of record `id`, oldest first.
    pub async fn transitions<R: WorkflowResource>(
        &self,
        id: Uuid,
    ) -> Result<Vec<workflow_transition::Model>, ServiceError> {
        let db = &*self.db_pool;
        find_model::<R, _>(db, id).await?;

        let rows = workflow_transition::Entity::find()
            .filter(workflow_transition::Column::Resource.eq(R::NAME))
            .filter(workflow_transition::Column::RecordId.eq(id))
            .order_by_asc(workflow_transition::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(rows)
    }
}
