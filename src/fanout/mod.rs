use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{OrderStatus, RefundStatus};

// ============================================================================
// Event Fanout
// ============================================================================
//
// Live listeners receive state-change facts over a global broadcast; there is
// no per-order subscription filtering at the transport layer, listeners
// self-filter on the payload. Fanout is best-effort: a missing or slow
// listener never affects the transaction that produced the event.
//
// The broadcaster is an injected capability, not a global. Tests substitute
// a recording fake.
//
// ============================================================================

/// Catalog of facts pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum LiveEvent {
    #[serde(rename_all = "camelCase")]
    OrderStatusUpdated {
        order_id: Uuid,
        status: OrderStatus,
        message: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ShipmentUpdated {
        shipment_id: Uuid,
        status: OrderStatus,
        location: String,
    },
    #[serde(rename_all = "camelCase")]
    OrderCancelled {
        order_id: Uuid,
        status: OrderStatus,
        refund_status: Option<RefundStatus>,
    },
    #[serde(rename_all = "camelCase")]
    DriverAssigned { order_id: Uuid, driver_id: Uuid },
    #[serde(rename_all = "camelCase")]
    DeliveryUpdate { order_id: Uuid, status: OrderStatus },
    #[serde(rename_all = "camelCase")]
    OrderDelivered { order_id: Uuid },
}

impl LiveEvent {
    /// Wire name of the event, used as a metrics label.
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::OrderStatusUpdated { .. } => "orderStatusUpdated",
            LiveEvent::ShipmentUpdated { .. } => "shipmentUpdated",
            LiveEvent::OrderCancelled { .. } => "orderCancelled",
            LiveEvent::DriverAssigned { .. } => "driverAssigned",
            LiveEvent::DeliveryUpdate { .. } => "deliveryUpdate",
            LiveEvent::OrderDelivered { .. } => "orderDelivered",
        }
    }
}

/// Push-side capability handed to the store at construction.
///
/// `publish` is fire-and-forget: implementations must never block on or fail
/// because of listeners.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, event: LiveEvent);
}

/// Broadcaster backed by a tokio broadcast channel. Send order is delivery
/// order for every subscriber, so events published in commit order are
/// observed in commit order.
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<LiveEvent>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, event: LiveEvent) {
        tracing::debug!(event = event.name(), "broadcasting live event");
        // Err means no live receivers; that is fine.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_receivers_does_not_fail() {
        let fanout = ChannelBroadcaster::new(16);
        fanout.publish(LiveEvent::OrderDelivered {
            order_id: Uuid::new_v4(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_sees_events_in_send_order() {
        let fanout = ChannelBroadcaster::new(16);
        let mut rx = fanout.subscribe();
        let order_id = Uuid::new_v4();

        fanout.publish(LiveEvent::OrderStatusUpdated {
            order_id,
            status: OrderStatus::Pending,
            message: None,
        });
        fanout.publish(LiveEvent::OrderStatusUpdated {
            order_id,
            status: OrderStatus::Processing,
            message: None,
        });

        match rx.recv().await.unwrap() {
            LiveEvent::OrderStatusUpdated { status, .. } => {
                assert_eq!(status, OrderStatus::Pending)
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            LiveEvent::OrderStatusUpdated { status, .. } => {
                assert_eq!(status, OrderStatus::Processing)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_wire_shape() {
        let event = LiveEvent::DriverAssigned {
            order_id: Uuid::nil(),
            driver_id: Uuid::nil(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"driverAssigned\""));
        assert!(json.contains("orderId"));
        assert!(json.contains("driverId"));
    }
}
