use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics::EVENTS_DROPPED;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, waiting for channel capacity
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes an event for a change that is already committed.
    /// A full or closed channel is logged and counted, never surfaced to the caller.
    pub fn publish(&self, event: Event) {
        if let Err(err) = self.sender.try_send(event) {
            EVENTS_DROPPED.inc();
            warn!(error = %err, "domain event dropped");
        }
    }
}

// Domain events emitted after a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Event {
    ZoneCreated(Uuid),
    ZoneUpdated(Uuid),
    ZoneDeleted(Uuid),
    EnergyReserved {
        zone_id: Uuid,
        kwh: Decimal,
        available_kwh_day: Decimal,
        actor_id: Option<Uuid>,
    },
    EnergyReleased {
        zone_id: Uuid,
        kwh: Decimal,
        available_kwh_day: Decimal,
        actor_id: Option<Uuid>,
    },
    ZoneStatusChanged {
        zone_id: Uuid,
        old_status: String,
        new_status: String,
    },
    WorkflowTransitioned {
        resource: String,
        record_id: Uuid,
        action: String,
        from_status: String,
        to_status: String,
        actor_id: Uuid,
    },
    ResourceCreated {
        resource: String,
        id: Uuid,
    },
    ResourceUpdated {
        resource: String,
        id: Uuid,
    },
    ResourceDeleted {
        resource: String,
        id: Uuid,
    },
}

// Handlers implementing this trait receive every event processed by the loop.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Writes each event to the application log.
pub struct LoggingEventHandler;

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle_event(&self, event: &Event) -> Result<(), String> {
        match event {
            Event::ZoneStatusChanged {
                zone_id,
                old_status,
                new_status,
            } => {
                warn!(%zone_id, %old_status, %new_status, "zone status changed");
            }
            Event::EnergyReserved { zone_id, kwh, available_kwh_day, .. } => {
                info!(%zone_id, %kwh, %available_kwh_day, "energy reserved");
            }
            Event::EnergyReleased { zone_id, kwh, available_kwh_day, .. } => {
                info!(%zone_id, %kwh, %available_kwh_day, "energy released");
            }
            Event::WorkflowTransitioned {
                resource,
                record_id,
                action,
                to_status,
                ..
            } => {
                info!(%resource, %record_id, %action, %to_status, "workflow transitioned");
            }
            other => info!(event = ?other, "domain event"),
        }
        Ok(())
    }
}

/// Event loop with the default logging handler.
pub async fn process_events(rx: mpsc::Receiver<Event>) {
    process_events_with(rx, vec![Arc::new(LoggingEventHandler)]).await;
}

/// Drains the channel, handing each event to every handler in order.
pub async fn process_events_with(
    mut rx: mpsc::Receiver<Event>,
    handlers: Vec<Arc<dyn EventHandler>>,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(event = ?event, error = %e, "event handler failed");
            }
        }
    }

    info!("Event channel closed, processing loop finished");
}
