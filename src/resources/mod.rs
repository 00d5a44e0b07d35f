//! Bindings of every table to the generic repository and workflow engine.
//!
//! Each resource declares its request payloads and filters next to its
//! [`CrudResource`](crate::services::repository::CrudResource) implementation.

pub mod catalog;
pub mod content;
pub mod energy_zones;
pub mod finance;
pub mod operations;
pub mod rules;

pub use catalog::{Municipalities, Products, Providers};
pub use content::{Articles, Faqs, Pages};
pub use energy_zones::EnergyZones;
pub use finance::{CarbonCredits, Donations, EnergyBonds};
pub use operations::{MaintenanceTasks, SubscriptionRequests, UserSubscriptions};
