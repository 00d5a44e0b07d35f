pub mod common;
pub mod energy_zones;
pub mod resources;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::logging::component_logger;
use crate::services::{
    energy_zones::EnergyZoneService, repository::ResourceService, workflow::WorkflowService,
    ServiceSettings,
};
use crate::workflow::Clock;
use slog::Logger;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub resources: Arc<ResourceService>,
    pub workflow: Arc<WorkflowService>,
    pub zones: Arc<EnergyZoneService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
        base_logger: Logger,
    ) -> Self {
        let resources = Arc::new(ResourceService::new(
            db_pool.clone(),
            event_sender.clone(),
            clock.clone(),
            settings,
            component_logger(&base_logger, "resource_service"),
        ));
        let workflow = Arc::new(WorkflowService::new(
            db_pool.clone(),
            event_sender.clone(),
            clock.clone(),
            settings,
            component_logger(&base_logger, "workflow_service"),
        ));
        let zones = Arc::new(EnergyZoneService::new(
            db_pool,
            event_sender,
            clock,
            settings,
            component_logger(&base_logger, "energy_zone_service"),
        ));

        Self {
            resources,
            workflow,
            zones,
        }
    }
}
