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
pub enum CreditStatus {
    Pending,
    Approved,
    Rejected,
    Retired,
}

impl WorkflowState for CreditStatus {
    const RULES: &'static [TransitionRule<Self>] = &[
        TransitionRule {
            action: WorkflowAction::Approve,
            from: &[CreditStatus::Pending],
            to: CreditStatus::Approved,
        },
        TransitionRule {
            action: WorkflowAction::Reject,
            from: &[CreditStatus::Pending],
            to: CreditStatus::Rejected,
        },
        // Retiring a credit consumes it against an emissions claim.
        TransitionRule {
            action: WorkflowAction::Complete,
            from: &[CreditStatus::Approved],
            to: CreditStatus::Retired,
        },
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carbon_credits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_name: String,
    pub registry_reference: Option<String>,
    pub credit_type: String,
    pub tonnes_co2: Decimal,
    pub price_per_tonne: Decimal,
    pub vintage_year: i32,
    pub status: String,
    pub version: i32,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub retired_by: Option<Uuid>,
    pub retired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
