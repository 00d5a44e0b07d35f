//! Maintenance tasks, user subscriptions and subscription requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition, IntoActiveModel};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::rules::{
    assign, assign_nullable, canonical_status, kwh_quantity, non_negative, not_blank,
    positive_kwh_quantity,
};
use crate::db::AggregateSchema;
use crate::entities::maintenance_task::{self, TaskStatus};
use crate::entities::subscription_request::{self, RequestStatus};
use crate::entities::user_subscription::{self, SubscriptionStatus};
use crate::errors::ServiceError;
use crate::services::repository::{CrudResource, WriteContext};
use crate::services::workflow::WorkflowResource;
use crate::workflow::TransitionStamp;

// Maintenance tasks

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Critical,
}

fn task_priority(value: &str) -> Result<(), ValidationError> {
    value.parse::<TaskPriority>().map(|_| ()).map_err(|_| {
        let mut error = ValidationError::new("priority");
        error.message = Some("The priority must be one of low, normal, high or critical.".into());
        error
    })
}

fn canonical_priority(value: &str) -> String {
    value
        .parse::<TaskPriority>()
        .map(|priority| priority.to_string())
        .unwrap_or_else(|_| value.to_string())
}

fn default_priority() -> String {
    TaskPriority::Normal.to_string()
}

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateMaintenanceTaskRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub zone_id: Option<Uuid>,
    #[serde(default = "default_priority")]
    #[validate(custom = "task_priority")]
    pub priority: String,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateMaintenanceTaskRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub zone_id: Option<Uuid>,
    #[validate(custom = "task_priority")]
    pub priority: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceTaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub zone_id: Option<Uuid>,
}

pub struct MaintenanceTasks;

impl CrudResource for MaintenanceTasks {
    type Entity = maintenance_task::Entity;
    type Model = maintenance_task::Model;
    type ActiveModel = maintenance_task::ActiveModel;
    type Column = maintenance_task::Column;
    type View = maintenance_task::Model;
    type Create = CreateMaintenanceTaskRequest;
    type Update = UpdateMaintenanceTaskRequest;
    type Filter = MaintenanceTaskFilter;

    const NAME: &'static str = "maintenance-tasks";
    const LABEL: &'static str = "maintenance task";
    const PLURAL: &'static str = "maintenance tasks";

    fn id_column() -> maintenance_task::Column {
        maintenance_task::Column::Id
    }

    fn model_id(model: &maintenance_task::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [maintenance_task::Column] {
        &[
            maintenance_task::Column::Title,
            maintenance_task::Column::Description,
        ]
    }

    fn aggregate_schema() -> AggregateSchema<maintenance_task::Column> {
        AggregateSchema {
            created_at: maintenance_task::Column::CreatedAt,
            status: Some(maintenance_task::Column::Status),
            measures: &[],
            dimensions: &["status", "priority"],
        }
    }

    fn filter_condition(filter: &MaintenanceTaskFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition =
                condition.add(maintenance_task::Column::Status.eq(Self::normalize_status(status)?));
        }
        if let Some(priority) = &filter.priority {
            let priority = priority.parse::<TaskPriority>().map_err(|_| {
                ServiceError::field("priority", format!("Unknown priority '{}'.", priority))
            })?;
            condition = condition.add(maintenance_task::Column::Priority.eq(priority.to_string()));
        }
        if let Some(zone_id) = filter.zone_id {
            condition = condition.add(maintenance_task::Column::ZoneId.eq(zone_id));
        }
        Ok(condition)
    }

    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        canonical_status::<TaskStatus>(raw, Self::LABEL)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateMaintenanceTaskRequest,
    ) -> Result<maintenance_task::ActiveModel, ServiceError> {
        Ok(maintenance_task::ActiveModel {
            id: Set(id),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            zone_id: Set(input.zone_id),
            priority: Set(canonical_priority(&input.priority)),
            scheduled_for: Set(input.scheduled_for),
            status: Set(TaskStatus::Pending.to_string()),
            version: Set(1),
            started_by: Set(None),
            started_at: Set(None),
            paused_at: Set(None),
            resumed_at: Set(None),
            completed_by: Set(None),
            completed_at: Set(None),
            completion_notes: Set(None),
            cancelled_by: Set(None),
            cancelled_at: Set(None),
            cancellation_reason: Set(None),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: maintenance_task::Model,
        input: &UpdateMaintenanceTaskRequest,
    ) -> Result<maintenance_task::ActiveModel, ServiceError> {
        let version = model.version;
        let mut active = model.into_active_model();
        assign(&mut active.title, &input.title);
        assign_nullable(&mut active.description, &input.description);
        assign_nullable(&mut active.zone_id, &input.zone_id);
        assign(
            &mut active.priority,
            &input.priority.as_deref().map(canonical_priority),
        );
        assign_nullable(&mut active.scheduled_for, &input.scheduled_for);
        active.version = Set(version + 1);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }

    fn version_guard(model: &maintenance_task::Model) -> Option<SimpleExpr> {
        Some(maintenance_task::Column::Version.eq(model.version))
    }
}

impl WorkflowResource for MaintenanceTasks {
    type State = TaskStatus;

    fn status_column() -> maintenance_task::Column {
        maintenance_task::Column::Status
    }

    fn version_column() -> maintenance_task::Column {
        maintenance_task::Column::Version
    }

    fn stored_status(model: &maintenance_task::Model) -> &str {
        &model.status
    }

    fn version(model: &maintenance_task::Model) -> i32 {
        model.version
    }

    /// Keyed on the action: `resume` and `start` share a target state.
    fn transitioned(
        model: maintenance_task::Model,
        to: TaskStatus,
        stamp: &TransitionStamp,
    ) -> maintenance_task::ActiveModel {
        use crate::workflow::WorkflowAction::*;

        let mut active = maintenance_task::ActiveModel {
            status: Set(to.to_string()),
            version: Set(model.version + 1),
            updated_at: Set(stamp.at),
            ..Default::default()
        };
        match stamp.action {
            Start => {
                active.started_by = Set(Some(stamp.actor));
                active.started_at = Set(Some(stamp.at));
            }
            Pause => active.paused_at = Set(Some(stamp.at)),
            Resume => active.resumed_at = Set(Some(stamp.at)),
            Complete => {
                active.completed_by = Set(Some(stamp.actor));
                active.completed_at = Set(Some(stamp.at));
                active.completion_notes = Set(stamp.note.clone());
            }
            Cancel => {
                active.cancelled_by = Set(Some(stamp.actor));
                active.cancelled_at = Set(Some(stamp.at));
                active.cancellation_reason = Set(stamp.note.clone());
            }
            _ => {}
        }
        active
    }
}

// User subscriptions

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateUserSubscriptionRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub plan_name: String,
    pub zone_id: Option<Uuid>,
    #[validate(custom = "kwh_quantity")]
    pub monthly_kwh: Decimal,
    #[validate(custom = "non_negative")]
    pub monthly_price: Decimal,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateUserSubscriptionRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub plan_name: Option<String>,
    pub zone_id: Option<Uuid>,
    #[validate(custom = "kwh_quantity")]
    pub monthly_kwh: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub monthly_price: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSubscriptionFilter {
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub plan_name: Option<String>,
}

pub struct UserSubscriptions;

impl CrudResource for UserSubscriptions {
    type Entity = user_subscription::Entity;
    type Model = user_subscription::Model;
    type ActiveModel = user_subscription::ActiveModel;
    type Column = user_subscription::Column;
    type View = user_subscription::Model;
    type Create = CreateUserSubscriptionRequest;
    type Update = UpdateUserSubscriptionRequest;
    type Filter = UserSubscriptionFilter;

    const NAME: &'static str = "user-subscriptions";
    const LABEL: &'static str = "user subscription";
    const PLURAL: &'static str = "user subscriptions";

    fn id_column() -> user_subscription::Column {
        user_subscription::Column::Id
    }

    fn model_id(model: &user_subscription::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [user_subscription::Column] {
        &[user_subscription::Column::PlanName]
    }

    fn aggregate_schema() -> AggregateSchema<user_subscription::Column> {
        AggregateSchema {
            created_at: user_subscription::Column::CreatedAt,
            status: Some(user_subscription::Column::Status),
            measures: &["monthly_kwh", "monthly_price"],
            dimensions: &["status", "plan_name"],
        }
    }

    fn filter_condition(filter: &UserSubscriptionFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition =
                condition.add(user_subscription::Column::Status.eq(Self::normalize_status(status)?));
        }
        if let Some(user_id) = filter.user_id {
            condition = condition.add(user_subscription::Column::UserId.eq(user_id));
        }
        if let Some(zone_id) = filter.zone_id {
            condition = condition.add(user_subscription::Column::ZoneId.eq(zone_id));
        }
        if let Some(plan_name) = &filter.plan_name {
            condition = condition.add(user_subscription::Column::PlanName.eq(plan_name.trim()));
        }
        Ok(condition)
    }

    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        canonical_status::<SubscriptionStatus>(raw, Self::LABEL)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateUserSubscriptionRequest,
    ) -> Result<user_subscription::ActiveModel, ServiceError> {
        Ok(user_subscription::ActiveModel {
            id: Set(id),
            user_id: Set(input.user_id),
            plan_name: Set(input.plan_name.trim().to_string()),
            zone_id: Set(input.zone_id),
            monthly_kwh: Set(input.monthly_kwh),
            monthly_price: Set(input.monthly_price),
            status: Set(SubscriptionStatus::Active.to_string()),
            version: Set(1),
            paused_by: Set(None),
            paused_at: Set(None),
            resumed_by: Set(None),
            resumed_at: Set(None),
            cancelled_by: Set(None),
            cancelled_at: Set(None),
            cancellation_reason: Set(None),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: user_subscription::Model,
        input: &UpdateUserSubscriptionRequest,
    ) -> Result<user_subscription::ActiveModel, ServiceError> {
        let version = model.version;
        let mut active = model.into_active_model();
        assign(&mut active.plan_name, &input.plan_name);
        assign_nullable(&mut active.zone_id, &input.zone_id);
        assign(&mut active.monthly_kwh, &input.monthly_kwh);
        assign(&mut active.monthly_price, &input.monthly_price);
        active.version = Set(version + 1);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }

    fn version_guard(model: &user_subscription::Model) -> Option<SimpleExpr> {
        Some(user_subscription::Column::Version.eq(model.version))
    }
}

impl WorkflowResource for UserSubscriptions {
    type State = SubscriptionStatus;

    fn status_column() -> user_subscription::Column {
        user_subscription::Column::Status
    }

    fn version_column() -> user_subscription::Column {
        user_subscription::Column::Version
    }

    fn stored_status(model: &user_subscription::Model) -> &str {
        &model.status
    }

    fn version(model: &user_subscription::Model) -> i32 {
        model.version
    }

    fn transitioned(
        model: user_subscription::Model,
        to: SubscriptionStatus,
        stamp: &TransitionStamp,
    ) -> user_subscription::ActiveModel {
        let mut active = user_subscription::ActiveModel {
            status: Set(to.to_string()),
            version: Set(model.version + 1),
            updated_at: Set(stamp.at),
            ..Default::default()
        };
        match to {
            SubscriptionStatus::Paused => {
                active.paused_by = Set(Some(stamp.actor));
                active.paused_at = Set(Some(stamp.at));
            }
            SubscriptionStatus::Active => {
                active.resumed_by = Set(Some(stamp.actor));
                active.resumed_at = Set(Some(stamp.at));
            }
            SubscriptionStatus::Cancelled => {
                active.cancelled_by = Set(Some(stamp.actor));
                active.cancelled_at = Set(Some(stamp.at));
                active.cancellation_reason = Set(stamp.note.clone());
            }
        }
        active
    }
}

// Subscription requests

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateSubscriptionRequestRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub applicant_name: String,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 3, max = 12, message = "The postal code must be between 3 and 12 characters."))]
    pub postal_code: String,
    #[validate(custom = "positive_kwh_quantity")]
    pub requested_kwh_day: Decimal,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateSubscriptionRequestRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub applicant_name: Option<String>,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 12, message = "The postal code must be between 3 and 12 characters."))]
    pub postal_code: Option<String>,
    #[validate(custom = "positive_kwh_quantity")]
    pub requested_kwh_day: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionRequestFilter {
    pub status: Option<String>,
    pub postal_code: Option<String>,
}

pub struct SubscriptionRequests;

impl CrudResource for SubscriptionRequests {
    type Entity = subscription_request::Entity;
    type Model = subscription_request::Model;
    type ActiveModel = subscription_request::ActiveModel;
    type Column = subscription_request::Column;
    type View = subscription_request::Model;
    type Create = CreateSubscriptionRequestRequest;
    type Update = UpdateSubscriptionRequestRequest;
    type Filter = SubscriptionRequestFilter;

    const NAME: &'static str = "subscription-requests";
    const LABEL: &'static str = "subscription request";
    const PLURAL: &'static str = "subscription requests";

    fn id_column() -> subscription_request::Column {
        subscription_request::Column::Id
    }

    fn model_id(model: &subscription_request::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [subscription_request::Column] {
        &[
            subscription_request::Column::ApplicantName,
            subscription_request::Column::Email,
            subscription_request::Column::PostalCode,
        ]
    }

    fn aggregate_schema() -> AggregateSchema<subscription_request::Column> {
        AggregateSchema {
            created_at: subscription_request::Column::CreatedAt,
            status: Some(subscription_request::Column::Status),
            measures: &["requested_kwh_day"],
            dimensions: &["status", "postal_code"],
        }
    }

    fn filter_condition(filter: &SubscriptionRequestFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition = condition
                .add(subscription_request::Column::Status.eq(Self::normalize_status(status)?));
        }
        if let Some(postal_code) = &filter.postal_code {
            condition =
                condition.add(subscription_request::Column::PostalCode.eq(postal_code.trim()));
        }
        Ok(condition)
    }

    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        canonical_status::<RequestStatus>(raw, Self::LABEL)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateSubscriptionRequestRequest,
    ) -> Result<subscription_request::ActiveModel, ServiceError> {
        Ok(subscription_request::ActiveModel {
            id: Set(id),
            applicant_name: Set(input.applicant_name.trim().to_string()),
            email: Set(input.email.trim().to_lowercase()),
            postal_code: Set(input.postal_code.trim().to_string()),
            requested_kwh_day: Set(input.requested_kwh_day),
            message: Set(input.message),
            status: Set(RequestStatus::Pending.to_string()),
            version: Set(1),
            approved_by: Set(None),
            approved_at: Set(None),
            rejected_by: Set(None),
            rejected_at: Set(None),
            rejection_reason: Set(None),
            processed_by: Set(None),
            processed_at: Set(None),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: subscription_request::Model,
        input: &UpdateSubscriptionRequestRequest,
    ) -> Result<subscription_request::ActiveModel, ServiceError> {
        let version = model.version;
        let mut active = model.into_active_model();
        assign(&mut active.applicant_name, &input.applicant_name);
        assign(
            &mut active.email,
            &input.email.as_ref().map(|email| email.trim().to_lowercase()),
        );
        assign(&mut active.postal_code, &input.postal_code);
        assign(&mut active.requested_kwh_day, &input.requested_kwh_day);
        assign_nullable(&mut active.message, &input.message);
        active.version = Set(version + 1);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }

    fn version_guard(model: &subscription_request::Model) -> Option<SimpleExpr> {
        Some(subscription_request::Column::Version.eq(model.version))
    }
}

impl WorkflowResource for SubscriptionRequests {
    type State = RequestStatus;

    fn status_column() -> subscription_request::Column {
        subscription_request::Column::Status
    }

    fn version_column() -> subscription_request::Column {
        subscription_request::Column::Version
    }

    fn stored_status(model: &subscription_request::Model) -> &str {
        &model.status
    }

    fn version(model: &subscription_request::Model) -> i32 {
        model.version
    }

    fn transitioned(
        model: subscription_request::Model,
        to: RequestStatus,
        stamp: &TransitionStamp,
    ) -> subscription_request::ActiveModel {
        let mut active = subscription_request::ActiveModel {
            status: Set(to.to_string()),
            version: Set(model.version + 1),
            updated_at: Set(stamp.at),
            ..Default::default()
        };
        match to {
            RequestStatus::Approved => {
                active.approved_by = Set(Some(stamp.actor));
                active.approved_at = Set(Some(stamp.at));
            }
            RequestStatus::Rejected => {
                active.rejected_by = Set(Some(stamp.actor));
                active.rejected_at = Set(Some(stamp.at));
                active.rejection_reason = Set(stamp.note.clone());
            }
            RequestStatus::Processed => {
                active.processed_by = Set(Some(stamp.actor));
                active.processed_at = Set(Some(stamp.at));
            }
            RequestStatus::Pending => {}
        }
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_are_case_insensitive() {
        assert!(task_priority("HIGH").is_ok());
        assert_eq!(canonical_priority("High"), "high");
        assert!(task_priority("urgent").is_err());
    }

    #[test]
    fn task_priority_defaults_to_normal() {
        let request: CreateMaintenanceTaskRequest =
            serde_json::from_str(r#"{"title": "Inspect inverter"}"#).unwrap();
        assert_eq!(request.priority, "normal");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn unknown_priority_filter_is_rejected() {
        let filter = MaintenanceTaskFilter {
            priority: Some("someday".to_string()),
            ..Default::default()
        };
        assert!(MaintenanceTasks::filter_condition(&filter).is_err());
    }
}
