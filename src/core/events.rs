//! Warehouse-changed notifications.
//!
//! Every ledger mutation publishes a [`WarehouseChanged`] so dependent views
//! (dashboard counts, the required-parts list) know to refresh. Publishing with
//! no subscribers is not an error.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

/// The ledger of `org_id` changed for `skus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseChanged {
    /// Organization whose warehouse changed
    pub org_id: String,
    /// SKUs whose on-hand quantity changed, or that were added or removed
    pub skus: Vec<String>,
}

/// Broadcast channel for [`WarehouseChanged`].
#[derive(Debug, Clone)]
pub struct WarehouseEvents {
    sender: broadcast::Sender<WarehouseChanged>,
}

impl Default for WarehouseEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl WarehouseEvents {
    /// Creates a channel with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// New receiver; sees events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WarehouseChanged> {
        self.sender.subscribe()
    }

    /// Publishes an event. Returns how many subscribers received it.
    pub fn publish(&self, org_id: &str, skus: Vec<String>) -> usize {
        let event = WarehouseChanged {
            org_id: org_id.to_string(),
            skus,
        };
        debug!("Warehouse changed: {:?}", event);
        self.sender.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let events = WarehouseEvents::new();
        let mut rx = events.subscribe();

        assert_eq!(events.publish("org", vec!["A".into()]), 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.org_id, "org");
        assert_eq!(event.skus, vec!["A".to_string()]);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let events = WarehouseEvents::new();
        assert_eq!(events.publish("org", vec![]), 0);
    }
}
