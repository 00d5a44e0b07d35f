use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "municipalities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub province: Option<String>,
    pub postal_code_prefix: Option<String>,
    pub population: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::energy_zone_summary::Entity")]
    EnergyZones,
}

impl Related<super::energy_zone_summary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EnergyZones.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
