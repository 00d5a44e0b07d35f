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
pub enum DonationStatus {
    Pending,
    Confirmed,
    Processed,
    Refunded,
    Cancelled,
}

impl WorkflowState for DonationStatus {
    const RULES: &'static [TransitionRule<Self>] = &[
        TransitionRule {
            action: WorkflowAction::Confirm,
            from: &[DonationStatus::Pending],
            to: DonationStatus::Confirmed,
        },
        TransitionRule {
            action: WorkflowAction::Process,
            from: &[DonationStatus::Confirmed],
            to: DonationStatus::Processed,
        },
        TransitionRule {
            action: WorkflowAction::Refund,
            from: &[DonationStatus::Confirmed, DonationStatus::Processed],
            to: DonationStatus::Refunded,
        },
        TransitionRule {
            action: WorkflowAction::Cancel,
            from: &[DonationStatus::Pending],
            to: DonationStatus::Cancelled,
        },
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub donor_name: String,
    pub donor_email: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub campaign: Option<String>,
    pub status: String,
    pub version: i32,
    pub confirmed_by: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub refunded_by: Option<Uuid>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
