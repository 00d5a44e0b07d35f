use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Traffic-light status of a zone, derived from utilization.
/// The Spanish labels used by older clients parse to the same values.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    #[strum(to_string = "green", serialize = "verde")]
    Green,
    #[strum(to_string = "amber", serialize = "naranja")]
    Amber,
    #[strum(to_string = "red", serialize = "rojo")]
    Red,
}

impl ZoneStatus {
    pub const ALL: [ZoneStatus; 3] = [ZoneStatus::Green, ZoneStatus::Amber, ZoneStatus::Red];
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "energy_zone_summaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub zone_name: String,
    pub postal_code: String,
    pub municipality_id: Option<Uuid>,
    pub estimated_production_kwh_day: Decimal,
    pub reserved_kwh_day: Decimal,
    pub requested_kwh_day: Decimal,
    pub available_kwh_day: Decimal,
    pub status: String,
    pub version: i32,
    pub last_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::municipality::Entity",
        from = "Column::MunicipalityId",
        to = "super::municipality::Column::Id"
    )]
    Municipality,
    #[sea_orm(has_many = "super::energy_zone_movement::Entity")]
    Movements,
}

impl Related<super::municipality::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Municipality.def()
    }
}

impl Related<super::energy_zone_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn ledger(&self) -> crate::services::zone_ledger::Ledger {
        crate::services::zone_ledger::Ledger::new(
            self.estimated_production_kwh_day,
            self.reserved_kwh_day,
            self.requested_kwh_day,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_labels_parse_to_canonical_status() {
        assert_eq!("verde".parse::<ZoneStatus>().unwrap(), ZoneStatus::Green);
        assert_eq!("Naranja".parse::<ZoneStatus>().unwrap(), ZoneStatus::Amber);
        assert_eq!("rojo".parse::<ZoneStatus>().unwrap(), ZoneStatus::Red);
        assert_eq!("amber".parse::<ZoneStatus>().unwrap(), ZoneStatus::Amber);
        assert_eq!(ZoneStatus::Red.to_string(), "red");
    }
}
