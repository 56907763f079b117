use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously, waiting for channel capacity
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes without blocking the caller.
    ///
    /// Events are emitted after the state change is committed, so a full or
    /// closed channel must not turn a successful operation into an error.
    pub fn send_or_log(&self, event: Event) {
        let name = event.name();
        match self.sender.try_send(event) {
            Ok(()) => {
                counter!("activity_pricing_events.published", 1, "event" => name);
            }
            Err(TrySendError::Full(event)) => {
                counter!("activity_pricing_events.dropped", 1, "event" => name);
                warn!(event = name, "Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Closed(event)) => {
                counter!("activity_pricing_events.dropped", 1, "event" => name);
                warn!(event = name, "Event channel closed, dropping {:?}", event);
            }
        }
    }
}

/// Domain events published by the activity and pricing services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ActivityDefinitionCreated {
        definition_id: String,
        customer_id: String,
    },
    ActivityDefinitionDeactivated {
        definition_id: String,
        customer_id: String,
    },
    ActivityInstanceCreated {
        instance_id: String,
        customer_id: String,
        order_id: String,
        line_total: Decimal,
    },
    ActivityInstanceUpdated {
        instance_id: String,
        customer_id: String,
    },
    ActivityInstanceDeactivated {
        instance_id: String,
        customer_id: String,
    },
    PriceTierCreated {
        tier_id: String,
        customer_id: String,
        activity_definition_id: String,
    },
    PriceTierDeactivated {
        tier_id: String,
        customer_id: String,
    },
    PriceTierExpired {
        tier_id: String,
        customer_id: String,
        effective_to: DateTime<Utc>,
    },
}

impl Event {
    /// Stable label used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Event::ActivityDefinitionCreated { .. } => "activity_definition_created",
            Event::ActivityDefinitionDeactivated { .. } => "activity_definition_deactivated",
            Event::ActivityInstanceCreated { .. } => "activity_instance_created",
            Event::ActivityInstanceUpdated { .. } => "activity_instance_updated",
            Event::ActivityInstanceDeactivated { .. } => "activity_instance_deactivated",
            Event::PriceTierCreated { .. } => "price_tier_created",
            Event::PriceTierDeactivated { .. } => "price_tier_deactivated",
            Event::PriceTierExpired { .. } => "price_tier_expired",
        }
    }

    pub fn customer_id(&self) -> &str {
        match self {
            Event::ActivityDefinitionCreated { customer_id, .. }
            | Event::ActivityDefinitionDeactivated { customer_id, .. }
            | Event::ActivityInstanceCreated { customer_id, .. }
            | Event::ActivityInstanceUpdated { customer_id, .. }
            | Event::ActivityInstanceDeactivated { customer_id, .. }
            | Event::PriceTierCreated { customer_id, .. }
            | Event::PriceTierDeactivated { customer_id, .. }
            | Event::PriceTierExpired { customer_id, .. } => customer_id,
        }
    }
}

// Handlers implementing this trait process events asynchronously.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

/// Drains the channel, logging every event. Returns once all senders are dropped.
pub async fn process_events(rx: mpsc::Receiver<Event>) {
    process_events_with_handlers(rx, Vec::new()).await
}

/// Drains the channel and fans each event out to `handlers`.
///
/// A failing handler is logged and does not stop the loop.
pub async fn process_events_with_handlers(
    mut rx: mpsc::Receiver<Event>,
    handlers: Vec<Arc<dyn EventHandler>>,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(
            event = event.name(),
            customer_id = event.customer_id(),
            "Received event"
        );
        debug!("Event payload: {:?}", event);

        let results = join_all(
            handlers
                .iter()
                .map(|handler| handler.handle_event(event.clone())),
        )
        .await;

        for result in results {
            if let Err(e) = result {
                error!(event = event.name(), "Event handler failed: {}", e);
            }
        }
    }

    info!("Event channel closed, stopping event processing loop");
}
