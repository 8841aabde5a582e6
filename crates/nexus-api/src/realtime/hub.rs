use nexus_core::events::{Address, DomainEvent, NotificationRelay};
use tokio::sync::broadcast;
use tracing::warn;

/// One addressed event on the fan-out channel.
#[derive(Debug, Clone)]
pub struct RelayFrame {
    pub address: Address,
    pub event: DomainEvent,
}

/// Fan-out hub between domain mutations and WebSocket sessions.
///
/// Publishing never waits on receivers. A session that falls more than
/// the channel capacity behind loses the oldest frames first.
pub struct RealtimeHub {
    tx: broadcast::Sender<RelayFrame>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayFrame> {
        self.tx.subscribe()
    }
}

impl NotificationRelay for RealtimeHub {
    fn publish(&self, address: Address, event: DomainEvent) {
        let frame = RelayFrame { address, event };
        if let Err(err) = self.tx.send(frame) {
            warn!(
                "Realtime frame dropped (no subscribers): {}",
                err.0.event.name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nexus_core::domain::{NewProduct, Product, ProductCategory};
    use uuid::Uuid;

    fn product() -> Product {
        Product::new(
            NewProduct {
                product_id: "NEXUS-100".into(),
                name: "Vaccine batch".into(),
                description: None,
                category: ProductCategory::Pharmaceuticals,
                manufacturer_id: Uuid::new_v4(),
                manufacturing_date: Utc::now(),
                expiry_date: None,
                batch_number: None,
                origin_location: "Cold store A".into(),
                min_temperature: Some(2.0),
                max_temperature: Some(8.0),
            },
            "{}".into(),
        )
    }

    #[tokio::test]
    async fn subscribers_receive_published_frames() {
        let hub = RealtimeHub::new(16);
        let mut rx = hub.subscribe();

        let p = product();
        hub.publish(
            Address::Product(p.id),
            DomainEvent::ProductUpdated {
                product: p.clone(),
                message: "Product updated".into(),
            },
        );

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.address, Address::Product(p.id));
        assert_eq!(frame.event.name(), "product:updated");
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_harmless() {
        let hub = RealtimeHub::new(16);
        let p = product();
        hub.publish(
            Address::Broadcast,
            DomainEvent::ProductCreated {
                product: p,
                message: "Product registered successfully".into(),
            },
        );
    }
}
