pub mod article;
pub mod carbon_credit;
pub mod donation;
pub mod energy_bond;
pub mod energy_zone_movement;
pub mod energy_zone_summary;
pub mod faq;
pub mod maintenance_task;
pub mod municipality;
pub mod page;
pub mod product;
pub mod provider;
pub mod subscription_request;
pub mod user_subscription;
pub mod workflow_transition;
