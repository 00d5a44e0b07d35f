use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::workflow::{TransitionRule, WorkflowAction, WorkflowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl WorkflowState for TaskStatus {
    const RULES: &'static [TransitionRule<Self>] = &[
        TransitionRule {
            action: WorkflowAction::Start,
            from: &[TaskStatus::Pending],
            to: TaskStatus::InProgress,
        },
        TransitionRule {
            action: WorkflowAction::Pause,
            from: &[TaskStatus::InProgress],
            to: TaskStatus::Paused,
        },
        TransitionRule {
            action: WorkflowAction::Resume,
            from: &[TaskStatus::Paused],
            to: TaskStatus::InProgress,
        },
        TransitionRule {
            action: WorkflowAction::Complete,
            from: &[TaskStatus::InProgress],
            to: TaskStatus::Completed,
        },
        TransitionRule {
            action: WorkflowAction::Cancel,
            from: &[TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Paused],
            to: TaskStatus::Cancelled,
        },
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "maintenance_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub zone_id: Option<Uuid>,
    pub priority: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: String,
    pub version: i32,
    pub started_by: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_notes: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::energy_zone_summary::Entity",
        from = "Column::ZoneId",
        to = "super::energy_zone_summary::Column::Id"
    )]
    Zone,
}

impl Related<super::energy_zone_summary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Zone.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
