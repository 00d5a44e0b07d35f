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
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Processed,
}

impl WorkflowState for RequestStatus {
    const RULES: &'static [TransitionRule<Self>] = &[
        TransitionRule {
            action: WorkflowAction::Approve,
            from: &[RequestStatus::Pending],
            to: RequestStatus::Approved,
        },
        TransitionRule {
            action: WorkflowAction::Reject,
            from: &[RequestStatus::Pending],
            to: RequestStatus::Rejected,
        },
        TransitionRule {
            action: WorkflowAction::Process,
            from: &[RequestStatus::Approved],
            to: RequestStatus::Processed,
        },
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub applicant_name: String,
    pub email: String,
    pub postal_code: String,
    pub requested_kwh_day: Decimal,
    pub message: Option<String>,
    pub status: String,
    pub version: i32,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
