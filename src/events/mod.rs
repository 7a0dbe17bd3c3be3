use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Work order events
    WorkOrderRegistered(i32),
    WorkOrderUpdated(i32),
    WorkOrderConfirmed(i32),
    WorkOrderStatusChanged {
        work_order_id: i32,
        old_status: String,
        new_status: String,
    },
    WorkOrderClosed {
        work_order_id: i32,
        closed_at: DateTime<Utc>,
    },

    // Incident record events
    IncidentAttached {
        work_order_id: i32,
        record_id: i32,
    },
    IncidentResolved {
        work_order_id: i32,
        record_id: i32,
    },
    IncidentDetached {
        work_order_id: i32,
        record_id: i32,
    },

    // Asset events
    AssetCreated(i32),
    AssetUpdated(i32),
    AssetDeactivated(i32),

    // Spare part events
    SparePartCreated(i32),
    SparePartUpdated(i32),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event as it arrives.
///
/// Runs until every EventSender clone is dropped. Downstream consumers
/// (notifications, audit trail) hook in here.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");

    while let Some(event) = receiver.recv().await {
        match &event {
            Event::WorkOrderStatusChanged {
                work_order_id,
                old_status,
                new_status,
            } => {
                info!(
                    work_order_id = work_order_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Work order status changed"
                );
            }
            Event::WorkOrderClosed {
                work_order_id,
                closed_at,
            } => {
                info!(work_order_id = work_order_id, closed_at = %closed_at, "Work order closed");
            }
            other => {
                info!(event = ?other, "Domain event");
            }
        }
    }

    warn!("Event channel closed; event processor stopping");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::WorkOrderRegistered(42))
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::WorkOrderRegistered(id)) => assert_eq!(id, 42),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::AssetCreated(1)).await;
        assert!(result.is_err());
    }
}
