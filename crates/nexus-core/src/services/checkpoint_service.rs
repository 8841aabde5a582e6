//! Checkpoint trail service
//!
//! Records custody scans and keeps the product's denormalized state in
//! step with the trail. Inserts apply the active derivation policy;
//! edits and deletes re-derive from the full remaining trail. State
//! writes ride in the same transaction as the checkpoint write, through
//! the repository.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::authz;
use crate::derive::{
    classify_reading, derive_current_state, display_order, state_after_insert, AlertType,
    DerivedState, ACTIVE_DERIVATION_POLICY,
};
use crate::domain::{
    Checkpoint, CheckpointDetail, CheckpointWithHandler, HandlerBrief, NewCheckpoint, Product,
    ProductBrief, User,
};
use crate::error::DomainError;
use crate::events::Notifier;
use crate::repositories::{CheckpointRepository, ProductRepository, UserRepository};
use crate::services::{parse_date, required};

/// Payload for recording a scan.
///
/// `product_id` is the product row id, not the label key. `timestamp`
/// carries the event time for scans synced after the fact.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCheckpointRequest {
    pub product_id: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub notes: Option<String>,
    pub blockchain_hash: Option<String>,
    pub timestamp: Option<String>,
}

/// Partial checkpoint update. Same presence rules as `ProductPatch`:
/// an absent key leaves the field alone, an explicit `null` clears a
/// nullable one. The event time itself is not editable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointPatch {
    pub location: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub latitude: Option<Option<f64>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub longitude: Option<Option<f64>>,
    pub status: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub temperature: Option<Option<f64>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub humidity: Option<Option<f64>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub blockchain_hash: Option<Option<String>>,
}

impl CheckpointPatch {
    fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.status.is_none()
            && self.temperature.is_none()
            && self.humidity.is_none()
            && self.notes.is_none()
            && self.blockchain_hash.is_none()
    }

    /// Whether the edit can move the product's derived state.
    fn touches_state(&self) -> bool {
        self.location.is_some() || self.status.is_some()
    }
}

/// One out-of-range reading from the alert scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureAlert {
    #[serde(flatten)]
    pub reading: CheckpointWithHandler,
    pub alert_type: AlertType,
    pub threshold: f64,
}

/// Configured bounds echoed back with the alert scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Result of scanning a product's trail for temperature violations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureAlertReport {
    pub alerts: Vec<TemperatureAlert>,
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_range: Option<TemperatureRange>,
}

pub struct CheckpointService {
    checkpoint_repo: Arc<dyn CheckpointRepository>,
    product_repo: Arc<dyn ProductRepository>,
    user_repo: Arc<dyn UserRepository>,
    notifier: Notifier,
}

impl CheckpointService {
    pub fn new(
        checkpoint_repo: Arc<dyn CheckpointRepository>,
        product_repo: Arc<dyn ProductRepository>,
        user_repo: Arc<dyn UserRepository>,
        notifier: Notifier,
    ) -> Self {
        Self {
            checkpoint_repo,
            product_repo,
            user_repo,
            notifier,
        }
    }

    /// Records a scan as `actor` and derives the product state under
    /// the active policy. Announces the checkpoint, any state movement,
    /// and any temperature violation.
    pub async fn add(
        &self,
        actor: &User,
        req: AddCheckpointRequest,
    ) -> Result<CheckpointWithHandler, DomainError> {
        authz::ensure_can_add_checkpoint(actor.role)?;

        let product_raw = required(req.product_id).ok_or_else(required_checkpoint_fields)?;
        let location = required(req.location).ok_or_else(required_checkpoint_fields)?;
        let status = required(req.status).ok_or_else(required_checkpoint_fields)?;

        let product_id =
            Uuid::parse_str(&product_raw).map_err(|_| DomainError::ProductNotFound)?;
        let timestamp = match required(req.timestamp) {
            Some(raw) => Some(
                parse_date(&raw)
                    .ok_or_else(|| DomainError::ValidationError("Invalid timestamp".into()))?,
            ),
            None => None,
        };

        let product = self
            .product_repo
            .find_by_id(&product_id)
            .await?
            .ok_or(DomainError::ProductNotFound)?;

        let checkpoint = Checkpoint::new(NewCheckpoint {
            product_id,
            location,
            latitude: req.latitude,
            longitude: req.longitude,
            status,
            temperature: req.temperature,
            humidity: req.humidity,
            notes: req.notes,
            handled_by: actor.id,
            blockchain_hash: req.blockchain_hash,
            timestamp,
        });

        let newest = self.checkpoint_repo.latest_for_product(&product_id).await?;
        let state = state_after_insert(
            &product,
            newest.as_ref(),
            &checkpoint,
            ACTIVE_DERIVATION_POLICY,
        );

        let created = self
            .checkpoint_repo
            .insert_with_product_state(&checkpoint, &state)
            .await?;
        info!(
            "Checkpoint added for product {} at {}",
            product.id, created.location
        );

        self.announce_insert(&product, &state, &created);

        Ok(CheckpointWithHandler {
            checkpoint: created,
            handler: HandlerBrief::from(actor),
        })
    }

    /// The product's trail with handlers, newest first.
    pub async fn list_by_product(
        &self,
        product_id: &Uuid,
    ) -> Result<Vec<CheckpointWithHandler>, DomainError> {
        self.product_repo
            .find_by_id(product_id)
            .await?
            .ok_or(DomainError::ProductNotFound)?;

        let mut checkpoints = self
            .checkpoint_repo
            .list_for_product_with_handlers(product_id)
            .await?;
        checkpoints.sort_by(|a, b| display_order(&a.checkpoint, &b.checkpoint));
        Ok(checkpoints)
    }

    /// Single checkpoint with its handler and owning product.
    pub async fn get(&self, id: &Uuid) -> Result<CheckpointDetail, DomainError> {
        let checkpoint = self
            .checkpoint_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::CheckpointNotFound)?;
        let handler = self.handler_of(&checkpoint).await?;
        let product = self
            .product_repo
            .find_by_id(&checkpoint.product_id)
            .await?
            .ok_or(DomainError::ProductNotFound)?;

        Ok(CheckpointDetail {
            checkpoint,
            handler: HandlerBrief::from(&handler),
            product: ProductBrief::from(&product),
        })
    }

    /// Applies a partial edit. When the edit can move the derived
    /// state, the full trail is re-derived with the edit in place and
    /// the product state rides in the same write.
    pub async fn update(
        &self,
        actor: &User,
        id: &Uuid,
        patch: CheckpointPatch,
    ) -> Result<CheckpointWithHandler, DomainError> {
        let checkpoint = self
            .checkpoint_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::CheckpointNotFound)?;
        authz::ensure_can_update_checkpoint(&checkpoint, actor)?;

        let handler = self.handler_of(&checkpoint).await?;
        if patch.is_empty() {
            return Ok(CheckpointWithHandler {
                checkpoint,
                handler: HandlerBrief::from(&handler),
            });
        }

        let touches_state = patch.touches_state();
        let mut edited = checkpoint.clone();
        if let Some(location) = patch.location {
            edited.location = location;
        }
        if let Some(latitude) = patch.latitude {
            edited.latitude = latitude;
        }
        if let Some(longitude) = patch.longitude {
            edited.longitude = longitude;
        }
        if let Some(status) = patch.status {
            edited.status = status;
        }
        if let Some(temperature) = patch.temperature {
            edited.temperature = temperature;
        }
        if let Some(humidity) = patch.humidity {
            edited.humidity = humidity;
        }
        if let Some(notes) = patch.notes {
            edited.notes = notes;
        }
        if let Some(blockchain_hash) = patch.blockchain_hash {
            edited.blockchain_hash = blockchain_hash;
        }

        let mut state_ctx: Option<(Product, DerivedState)> = None;
        if touches_state {
            let product = self
                .product_repo
                .find_by_id(&checkpoint.product_id)
                .await?
                .ok_or(DomainError::ProductNotFound)?;
            let mut trail = self
                .checkpoint_repo
                .list_for_product(&checkpoint.product_id)
                .await?;
            for cp in trail.iter_mut() {
                if cp.id == edited.id {
                    *cp = edited.clone();
                }
            }
            let state = derive_current_state(&product, &trail);
            state_ctx = Some((product, state));
        }

        let updated = self
            .checkpoint_repo
            .update_with_product_state(&edited, state_ctx.as_ref().map(|(_, s)| s.clone()))
            .await?;
        info!("Checkpoint updated: {}", updated.id);

        self.notifier.checkpoint_updated(&updated);
        if let Some((product, state)) = state_ctx {
            self.announce_state_motion(product, &state, &updated);
        }

        Ok(CheckpointWithHandler {
            checkpoint: updated,
            handler: HandlerBrief::from(&handler),
        })
    }

    /// Removes a scan and re-derives the product state from what
    /// remains; an emptied trail resets the product to its origin.
    pub async fn delete(&self, actor: &User, id: &Uuid) -> Result<(), DomainError> {
        let checkpoint = self
            .checkpoint_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::CheckpointNotFound)?;
        authz::ensure_can_delete_checkpoint(&checkpoint, actor)?;

        let product = self
            .product_repo
            .find_by_id(&checkpoint.product_id)
            .await?
            .ok_or(DomainError::ProductNotFound)?;
        let remaining: Vec<Checkpoint> = self
            .checkpoint_repo
            .list_for_product(&checkpoint.product_id)
            .await?
            .into_iter()
            .filter(|cp| cp.id != checkpoint.id)
            .collect();
        let state = derive_current_state(&product, &remaining);

        self.checkpoint_repo
            .delete_with_product_state(&checkpoint.id, &checkpoint.product_id, &state)
            .await?;
        info!("Checkpoint deleted: {}", checkpoint.id);
        Ok(())
    }

    /// Scans the trail for readings outside the product's configured
    /// range. A product with neither bound set has no range to violate.
    pub async fn temperature_alerts(
        &self,
        product_id: &Uuid,
    ) -> Result<TemperatureAlertReport, DomainError> {
        let product = self
            .product_repo
            .find_by_id(product_id)
            .await?
            .ok_or(DomainError::ProductNotFound)?;

        if product.min_temperature.is_none() && product.max_temperature.is_none() {
            return Ok(TemperatureAlertReport {
                alerts: Vec::new(),
                count: 0,
                message: Some("No temperature range defined for this product".into()),
                temperature_range: None,
            });
        }

        let mut readings = self
            .checkpoint_repo
            .list_for_product_with_handlers(product_id)
            .await?;
        readings.sort_by(|a, b| display_order(&a.checkpoint, &b.checkpoint));

        let alerts: Vec<TemperatureAlert> = readings
            .into_iter()
            .filter_map(|reading| {
                classify_reading(
                    product.min_temperature,
                    product.max_temperature,
                    reading.checkpoint.temperature,
                )
                .map(|(alert_type, threshold)| TemperatureAlert {
                    reading,
                    alert_type,
                    threshold,
                })
            })
            .collect();

        Ok(TemperatureAlertReport {
            count: alerts.len() as i64,
            alerts,
            message: None,
            temperature_range: Some(TemperatureRange {
                min: product.min_temperature,
                max: product.max_temperature,
            }),
        })
    }

    /// Fan-out after an insert: the checkpoint itself, then any state
    /// movement, then any temperature violation.
    fn announce_insert(&self, product: &Product, state: &DerivedState, created: &Checkpoint) {
        let mut fresh = product.clone();
        fresh.current_status = state.current_status.clone();
        fresh.current_location = state.current_location.clone();
        fresh.touch();

        self.notifier.checkpoint_added(created, &fresh);
        self.announce_state_motion(product.clone(), state, created);

        if let (Some(temperature), Some((alert_type, threshold))) = (
            created.temperature,
            classify_reading(
                product.min_temperature,
                product.max_temperature,
                created.temperature,
            ),
        ) {
            self.notifier
                .temperature_alert(created, &fresh, alert_type, temperature, threshold);
        }
    }

    /// Publishes status / location events when `state` moved away from
    /// the product's stored fields. `product` carries the pre-write
    /// fields; event payloads carry the new ones.
    fn announce_state_motion(&self, product: Product, state: &DerivedState, checkpoint: &Checkpoint) {
        let old_status = product.current_status.clone();
        let old_location = product.current_location.clone();
        if state.current_status == old_status && state.current_location == old_location {
            return;
        }

        let mut fresh = product;
        fresh.current_status = state.current_status.clone();
        fresh.current_location = state.current_location.clone();
        fresh.touch();

        if state.current_status != old_status {
            self.notifier
                .status_changed(&fresh, &old_status, &state.current_status);
        }
        if state.current_location != old_location {
            self.notifier
                .location_updated(&fresh, &old_location, checkpoint);
        }
    }

    async fn handler_of(&self, checkpoint: &Checkpoint) -> Result<User, DomainError> {
        self.user_repo
            .find_by_id(&checkpoint.handled_by)
            .await?
            .ok_or_else(|| {
                DomainError::InternalError(format!(
                    "handler {} missing for checkpoint {}",
                    checkpoint.handled_by, checkpoint.id
                ))
            })
    }
}

fn required_checkpoint_fields() -> DomainError {
    DomainError::ValidationError("Product ID, location, and status are required".into())
}
