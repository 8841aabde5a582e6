//! Realtime notification events
//!
//! Mutations describe what happened as a [`DomainEvent`] and hand it to
//! a [`NotificationRelay`] with an [`Address`]. Delivery is
//! fire-and-forget: a relay must never fail the mutation that published
//! the event. The [`Notifier`] encodes which audiences hear about which
//! occurrence.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::derive::AlertType;
use crate::domain::{status, Checkpoint, Product, UserRole};

/// Where an event is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// Everyone watching one product.
    Product(Uuid),
    /// One user's personal feed.
    User(Uuid),
    /// Everyone signed in with a role.
    Role(UserRole),
    /// All connected clients.
    Broadcast,
}

impl Address {
    /// Room key as used by realtime subscriptions.
    pub fn room_key(&self) -> String {
        match self {
            Address::Product(id) => format!("product:{}", id),
            Address::User(id) => format!("user:{}", id),
            Address::Role(role) => format!("role:{}", role.as_str()),
            Address::Broadcast => "broadcast".to_string(),
        }
    }
}

/// Typed notification payloads.
///
/// Serializes as `{"event": "...", "payload": {...}}` with the exact
/// wire names subscribed clients expect.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum DomainEvent {
    #[serde(rename = "product:created", rename_all = "camelCase")]
    ProductCreated { product: Product, message: String },

    #[serde(rename = "product:updated", rename_all = "camelCase")]
    ProductUpdated { product: Product, message: String },

    #[serde(rename = "checkpoint:added", rename_all = "camelCase")]
    CheckpointAdded {
        checkpoint: Checkpoint,
        product: Product,
        message: String,
    },

    #[serde(rename = "checkpoint:updated", rename_all = "camelCase")]
    CheckpointUpdated { checkpoint: Checkpoint, message: String },

    #[serde(rename = "product:status:changed", rename_all = "camelCase")]
    StatusChanged {
        product_id: Uuid,
        old_status: String,
        new_status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        product: Option<Product>,
        message: String,
    },

    #[serde(rename = "product:delivered", rename_all = "camelCase")]
    ProductDelivered { product: Product, message: String },

    #[serde(rename = "temperature:alert", rename_all = "camelCase")]
    TemperatureAlert {
        checkpoint: Checkpoint,
        product: Product,
        alert_type: AlertType,
        temperature: f64,
        threshold: f64,
        message: String,
    },

    #[serde(rename = "product:location:updated", rename_all = "camelCase")]
    LocationUpdated {
        product_id: Uuid,
        old_location: String,
        new_location: String,
        checkpoint: Checkpoint,
        message: String,
    },

    #[serde(rename = "blockchain:confirmed", rename_all = "camelCase")]
    BlockchainConfirmed {
        product: Product,
        transaction_hash: String,
        message: String,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::ProductCreated { .. } => "product:created",
            DomainEvent::ProductUpdated { .. } => "product:updated",
            DomainEvent::CheckpointAdded { .. } => "checkpoint:added",
            DomainEvent::CheckpointUpdated { .. } => "checkpoint:updated",
            DomainEvent::StatusChanged { .. } => "product:status:changed",
            DomainEvent::ProductDelivered { .. } => "product:delivered",
            DomainEvent::TemperatureAlert { .. } => "temperature:alert",
            DomainEvent::LocationUpdated { .. } => "product:location:updated",
            DomainEvent::BlockchainConfirmed { .. } => "blockchain:confirmed",
        }
    }
}

/// Outbound side of the realtime layer.
pub trait NotificationRelay: Send + Sync {
    /// Delivers `event` to `address`. Must not block and must not fail
    /// the caller; a relay with no subscribers simply drops the event.
    fn publish(&self, address: Address, event: DomainEvent);
}

/// Maps domain occurrences to the audiences that hear about them.
#[derive(Clone)]
pub struct Notifier {
    relay: Arc<dyn NotificationRelay>,
}

impl Notifier {
    pub fn new(relay: Arc<dyn NotificationRelay>) -> Self {
        Self { relay }
    }

    pub fn product_created(&self, product: &Product) {
        self.relay.publish(
            Address::User(product.manufacturer_id),
            DomainEvent::ProductCreated {
                product: product.clone(),
                message: "Product registered successfully".into(),
            },
        );
        self.relay.publish(
            Address::Role(UserRole::Admin),
            DomainEvent::ProductCreated {
                product: product.clone(),
                message: format!("New product registered: {}", product.name),
            },
        );
    }

    pub fn product_updated(&self, product: &Product) {
        self.relay.publish(
            Address::Product(product.id),
            DomainEvent::ProductUpdated {
                product: product.clone(),
                message: "Product updated".into(),
            },
        );
        self.relay.publish(
            Address::User(product.manufacturer_id),
            DomainEvent::ProductUpdated {
                product: product.clone(),
                message: "Your product was updated".into(),
            },
        );
    }

    pub fn checkpoint_added(&self, checkpoint: &Checkpoint, product: &Product) {
        self.relay.publish(
            Address::Product(checkpoint.product_id),
            DomainEvent::CheckpointAdded {
                checkpoint: checkpoint.clone(),
                product: product.clone(),
                message: format!("New checkpoint: {}", checkpoint.location),
            },
        );
        self.relay.publish(
            Address::User(product.manufacturer_id),
            DomainEvent::CheckpointAdded {
                checkpoint: checkpoint.clone(),
                product: product.clone(),
                message: format!("New checkpoint added for {}", product.name),
            },
        );
    }

    pub fn checkpoint_updated(&self, checkpoint: &Checkpoint) {
        self.relay.publish(
            Address::Product(checkpoint.product_id),
            DomainEvent::CheckpointUpdated {
                checkpoint: checkpoint.clone(),
                message: "Checkpoint updated".into(),
            },
        );
    }

    /// `product` must already carry the new status.
    pub fn status_changed(&self, product: &Product, old_status: &str, new_status: &str) {
        self.relay.publish(
            Address::Product(product.id),
            DomainEvent::StatusChanged {
                product_id: product.id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
                product: None,
                message: format!("Status changed from {} to {}", old_status, new_status),
            },
        );
        self.relay.publish(
            Address::User(product.manufacturer_id),
            DomainEvent::StatusChanged {
                product_id: product.id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
                product: Some(product.clone()),
                message: format!("{} status changed to {}", product.name, new_status),
            },
        );
        if new_status == status::DELIVERED {
            self.relay.publish(
                Address::Role(UserRole::Logistics),
                DomainEvent::ProductDelivered {
                    product: product.clone(),
                    message: format!("Product delivered: {}", product.name),
                },
            );
        }
    }

    pub fn temperature_alert(
        &self,
        checkpoint: &Checkpoint,
        product: &Product,
        alert_type: AlertType,
        temperature: f64,
        threshold: f64,
    ) {
        let event = DomainEvent::TemperatureAlert {
            checkpoint: checkpoint.clone(),
            product: product.clone(),
            alert_type,
            temperature,
            threshold,
            message: format!("Temperature alert for {}: {}°C", product.name, temperature),
        };
        self.relay.publish(Address::Product(product.id), event.clone());
        self.relay
            .publish(Address::User(product.manufacturer_id), event.clone());
        self.relay
            .publish(Address::Role(UserRole::Logistics), event.clone());
        self.relay.publish(Address::Role(UserRole::Admin), event);
    }

    pub fn location_updated(&self, product: &Product, old_location: &str, checkpoint: &Checkpoint) {
        self.relay.publish(
            Address::Product(product.id),
            DomainEvent::LocationUpdated {
                product_id: product.id,
                old_location: old_location.to_string(),
                new_location: checkpoint.location.clone(),
                checkpoint: checkpoint.clone(),
                message: format!("Location updated to {}", checkpoint.location),
            },
        );
    }

    pub fn blockchain_confirmed(&self, product: &Product, transaction_hash: &str) {
        self.relay.publish(
            Address::Product(product.id),
            DomainEvent::BlockchainConfirmed {
                product: product.clone(),
                transaction_hash: transaction_hash.to_string(),
                message: "Blockchain transaction confirmed".into(),
            },
        );
        self.relay.publish(
            Address::User(product.manufacturer_id),
            DomainEvent::BlockchainConfirmed {
                product: product.clone(),
                transaction_hash: transaction_hash.to_string(),
                message: format!("{} blockchain registration confirmed", product.name),
            },
        );
    }
}

/// In-memory relay that records every frame, for asserting on fan-out
/// in service tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{Address, DomainEvent, NotificationRelay};

    #[derive(Default)]
    pub(crate) struct RecordingRelay {
        pub(crate) frames: Mutex<Vec<(Address, DomainEvent)>>,
    }

    impl NotificationRelay for RecordingRelay {
        fn publish(&self, address: Address, event: DomainEvent) {
            self.frames.lock().unwrap().push((address, event));
        }
    }

    impl RecordingRelay {
        pub(crate) fn summary(&self) -> Vec<(Address, &'static str)> {
            self.frames
                .lock()
                .unwrap()
                .iter()
                .map(|(a, e)| (*a, e.name()))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRelay;
    use super::*;
    use crate::domain::{NewCheckpoint, NewProduct, ProductCategory};
    use chrono::Utc;

    fn product() -> Product {
        Product::new(
            NewProduct {
                product_id: "NEXUS-001".into(),
                name: "Insulin".into(),
                description: None,
                category: ProductCategory::Pharmaceuticals,
                manufacturer_id: Uuid::new_v4(),
                manufacturing_date: Utc::now(),
                expiry_date: None,
                batch_number: None,
                origin_location: "Jakarta Plant".into(),
                min_temperature: Some(2.0),
                max_temperature: Some(8.0),
            },
            "{}".into(),
        )
    }

    fn checkpoint(product: &Product) -> Checkpoint {
        Checkpoint::new(NewCheckpoint {
            product_id: product.id,
            location: "Warehouse 7".into(),
            latitude: None,
            longitude: None,
            status: "IN_TRANSIT".into(),
            temperature: Some(10.0),
            humidity: None,
            notes: None,
            handled_by: Uuid::new_v4(),
            blockchain_hash: None,
            timestamp: None,
        })
    }

    fn notifier() -> (Arc<RecordingRelay>, Notifier) {
        let relay = Arc::new(RecordingRelay::default());
        let notifier = Notifier::new(relay.clone());
        (relay, notifier)
    }

    #[test]
    fn product_created_reaches_owner_and_admins() {
        let (relay, notifier) = notifier();
        let p = product();
        notifier.product_created(&p);
        assert_eq!(
            relay.summary(),
            vec![
                (Address::User(p.manufacturer_id), "product:created"),
                (Address::Role(UserRole::Admin), "product:created"),
            ]
        );
    }

    #[test]
    fn delivery_adds_logistics_notification() {
        let (relay, notifier) = notifier();
        let mut p = product();
        p.current_status = status::DELIVERED.to_string();
        notifier.status_changed(&p, "IN_TRANSIT", status::DELIVERED);
        assert_eq!(
            relay.summary(),
            vec![
                (Address::Product(p.id), "product:status:changed"),
                (Address::User(p.manufacturer_id), "product:status:changed"),
                (Address::Role(UserRole::Logistics), "product:delivered"),
            ]
        );
    }

    #[test]
    fn non_delivery_status_change_skips_logistics() {
        let (relay, notifier) = notifier();
        let p = product();
        notifier.status_changed(&p, "REGISTERED", "IN_TRANSIT");
        assert_eq!(relay.summary().len(), 2);
    }

    #[test]
    fn temperature_alert_fans_out_to_four_audiences() {
        let (relay, notifier) = notifier();
        let p = product();
        let cp = checkpoint(&p);
        notifier.temperature_alert(&cp, &p, AlertType::TooHot, 10.0, 8.0);
        assert_eq!(
            relay.summary(),
            vec![
                (Address::Product(p.id), "temperature:alert"),
                (Address::User(p.manufacturer_id), "temperature:alert"),
                (Address::Role(UserRole::Logistics), "temperature:alert"),
                (Address::Role(UserRole::Admin), "temperature:alert"),
            ]
        );
    }

    #[test]
    fn events_serialize_with_wire_names() {
        let p = product();
        let cp = checkpoint(&p);
        let event = DomainEvent::CheckpointAdded {
            checkpoint: cp,
            product: p,
            message: "New checkpoint: Warehouse 7".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "checkpoint:added");
        assert!(json["payload"]["checkpoint"]["handledBy"].is_string());
        assert_eq!(json["payload"]["product"]["currentStatus"], "REGISTERED");
    }

    #[test]
    fn product_room_status_event_omits_product_body() {
        let (relay, notifier) = notifier();
        let p = product();
        notifier.status_changed(&p, "REGISTERED", "IN_TRANSIT");

        let frames = relay.frames.lock().unwrap();
        let (_, room_event) = &frames[0];
        let json = serde_json::to_value(room_event).unwrap();
        assert!(json["payload"].get("product").is_none());
        assert_eq!(json["payload"]["oldStatus"], "REGISTERED");

        let (_, user_event) = &frames[1];
        let json = serde_json::to_value(user_event).unwrap();
        assert!(json["payload"].get("product").is_some());
    }

    #[test]
    fn room_keys_match_subscription_names() {
        let id = Uuid::nil();
        assert_eq!(Address::Product(id).room_key(), format!("product:{}", id));
        assert_eq!(Address::User(id).room_key(), format!("user:{}", id));
        assert_eq!(Address::Role(UserRole::Admin).room_key(), "role:ADMIN");
        assert_eq!(Address::Broadcast.room_key(), "broadcast");
    }
}
