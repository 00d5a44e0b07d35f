use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::workflow::{TransitionRule, WorkflowAction, WorkflowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
}

impl WorkflowState for SubscriptionStatus {
    const RULES: &'static [TransitionRule<Self>] = &[
        TransitionRule {
            action: WorkflowAction::Pause,
            from: &[SubscriptionStatus::Active],
            to: SubscriptionStatus::Paused,
        },
        TransitionRule {
            action: WorkflowAction::Resume,
            from: &[SubscriptionStatus::Paused],
            to: SubscriptionStatus::Active,
        },
        TransitionRule {
            action: WorkflowAction::Cancel,
            from: &[SubscriptionStatus::Active, SubscriptionStatus::Paused],
            to: SubscriptionStatus::Cancelled,
        },
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_name: String,
    pub zone_id: Option<Uuid>,
    pub monthly_kwh: Decimal,
    pub monthly_price: Decimal,
    pub status: String,
    pub version: i32,
    pub paused_by: Option<Uuid>,
    pub paused_at: Option<DateTime<Utc>>,
    pub resumed_by: Option<Uuid>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
