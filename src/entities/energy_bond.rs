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
pub enum BondStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl WorkflowState for BondStatus {
    const RULES: &'static [TransitionRule<Self>] = &[
        TransitionRule {
            action: WorkflowAction::Approve,
            from: &[BondStatus::Pending],
            to: BondStatus::Approved,
        },
        TransitionRule {
            action: WorkflowAction::Reject,
            from: &[BondStatus::Pending],
            to: BondStatus::Rejected,
        },
        TransitionRule {
            action: WorkflowAction::Cancel,
            from: &[BondStatus::Pending, BondStatus::Approved],
            to: BondStatus::Cancelled,
        },
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "energy_bonds")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub provider_id: Option<Uuid>,
    pub nominal_amount: Decimal,
    pub interest_rate: Decimal,
    pub term_months: i32,
    pub status: String,
    pub version: i32,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::provider::Entity",
        from = "Column::ProviderId",
        to = "super::provider::Column::Id"
    )]
    Provider,
}

impl Related<super::provider::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Provider.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
